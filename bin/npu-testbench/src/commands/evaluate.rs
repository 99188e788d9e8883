// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `npu-tb evaluate`: score result batches against ground truth.

use dataset::FsStorage;
use runtime::TestbenchConfig;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub fn execute(
    config: &TestbenchConfig,
    data_dir: PathBuf,
    json: bool,
    csv: Option<&Path>,
) -> anyhow::Result<()> {
    let storage = FsStorage::new(data_dir);
    let report = dataset::evaluate::evaluate(
        &storage,
        &config.dataset,
        &config.result_prefix,
        config.runtime.quant.output,
    )?;

    if let Some(path) = csv {
        let file = File::create(path)
            .map_err(|e| anyhow::anyhow!("cannot create '{}': {e}", path.display()))?;
        report.write_csv(BufWriter::new(file))?;
        tracing::info!(
            path = %path.display(),
            rows = report.records.len(),
            "wrote per-sample results"
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("  {}", report.summary());
    println!("  At {:.2}: {}", report.at_default.threshold, report.at_default);
    println!("  Best:    {}", report.optimal);
    let c = &report.at_default.confusion;
    println!();
    println!("               pred AF   pred normal");
    println!("  actual AF    {:>7}   {:>11}", c.tp, c.fn_);
    println!("  actual norm  {:>7}   {:>11}", c.fp, c.tn);
    Ok(())
}
