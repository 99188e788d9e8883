// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `npu-tb run`: the full test loop.
//!
//! ```text
//! ModelRuntime<Uninitialized> → initialize → <Ready> → Testbench::run
//! ```

use dataset::FsStorage;
use runtime::{Testbench, TestbenchConfig, WriteMode};
use std::path::PathBuf;

/// Command-line values that take precedence over the config file.
pub struct Overrides {
    pub data_dir: PathBuf,
    pub start: Option<u32>,
    pub max_index: Option<u32>,
    pub per_sample: bool,
}

pub fn execute(mut config: TestbenchConfig, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    if let Some(start) = overrides.start {
        config.start_index = start;
    }
    if overrides.max_index.is_some() {
        config.max_index = overrides.max_index;
    }
    if overrides.per_sample {
        config.write_mode = WriteMode::PerSample;
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              npu-tb · AF Test Loop                   ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("  Variant:  {}", runtime::model_params::ACTIVE_VARIANT);
    println!("  Data:     {}", overrides.data_dir.display());
    println!(
        "  Samples:  {} (x: {}, y: {})",
        config.dataset.num_samples,
        config.dataset.x_root,
        config.dataset.y_root
    );
    println!(
        "  Results:  {} ({:?})",
        config.dataset.result_root(),
        config.write_mode
    );
    println!();

    println!("  [1/2] Initializing accelerator and model...");
    let rt = super::ready_runtime(&config.runtime)?;
    println!("        {}", rt.graph().summary());
    println!("        Arena: {}", rt.arena_stats().summary());
    println!();

    println!("  [2/2] Running test loop...");
    let storage = FsStorage::new(&overrides.data_dir);
    let mut bench = Testbench::new(rt, storage, &config)?;
    let metrics = bench.run()?;
    println!();

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("  {}", metrics.summary());
        let loader = bench.loader_stats();
        println!(
            "  Loader: {} probed, {} missing, {} short, {} errors",
            loader.probed, loader.missing, loader.short, loader.errors
        );
    }
    Ok(())
}
