// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `npu-tb locate`: where an index lives on the card.

use dataset::shard::{batch_path, label_path, result_path, sample_path};
use dataset::{ShardPrefix, MAX_INDEX_SPACE};
use runtime::TestbenchConfig;

pub fn execute(config: &TestbenchConfig, index: u32) -> anyhow::Result<()> {
    anyhow::ensure!(
        index < MAX_INDEX_SPACE,
        "index {index} is outside the {MAX_INDEX_SPACE}-entry shard space"
    );
    let ds = &config.dataset;
    let prefix = ShardPrefix::of(index);

    println!("  Index:   {index} (shard {prefix}, block starts at {})", prefix.block_start());
    println!("  Sample:  {}", sample_path(&ds.x_root, index));
    println!("  Label:   {}", label_path(&ds.y_root, index));
    println!("  Batch:   {}", batch_path(ds.result_root(), index, &config.result_prefix));
    println!("  Result:  {}", result_path(ds.result_root(), index, &config.result_prefix));
    if index >= ds.num_samples {
        println!("  (beyond num_samples = {}, the loader never reaches it)", ds.num_samples);
    }
    Ok(())
}
