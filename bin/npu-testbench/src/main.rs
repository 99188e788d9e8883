// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # npu-tb
//!
//! Command-line driver for the on-device AF classifier testbench.
//!
//! ## Usage
//! ```bash
//! # Run the test loop over a sharded dataset
//! npu-tb --config testbench.toml run --data-dir /mnt/sd
//!
//! # Score the written result batches against ground truth
//! npu-tb --config testbench.toml evaluate --data-dir /mnt/sd
//!
//! # Inspect the model image and its arena plan
//! npu-tb inspect
//!
//! # Show where an index lives on the card
//! npu-tb locate 70000
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "npu-tb",
    about = "On-device NPU testbench for the AF classifier",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every sample through the model and write the result batches.
    Run {
        /// Directory the dataset roots are relative to.
        #[arg(short, long, default_value = ".")]
        data_dir: PathBuf,

        /// First index to scan from (overrides the config file).
        #[arg(long)]
        start: Option<u32>,

        /// Stop before this index (overrides the config file).
        #[arg(long)]
        max_index: Option<u32>,

        /// Write one file per sample instead of 256-entry batches.
        #[arg(long)]
        per_sample: bool,

        /// Print the run metrics as JSON instead of a summary line.
        #[arg(long)]
        json: bool,
    },

    /// Score written result batches against the ground-truth labels.
    Evaluate {
        /// Directory the dataset roots are relative to.
        #[arg(short, long, default_value = ".")]
        data_dir: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Also write one CSV row per scored sample to this file.
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },

    /// Print the model image, its operators and the arena plan.
    Inspect,

    /// Print the shard paths of a sample index.
    Locate {
        /// Sample index.
        index: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            data_dir,
            start,
            max_index,
            per_sample,
            json,
        } => commands::run::execute(
            config,
            commands::run::Overrides {
                data_dir,
                start,
                max_index,
                per_sample,
            },
            json,
        ),
        Commands::Evaluate {
            data_dir,
            json,
            csv,
        } => commands::evaluate::execute(&config, data_dir, json, csv.as_deref()),
        Commands::Inspect => commands::inspect::execute(&config),
        Commands::Locate { index } => commands::locate::execute(&config, index),
    }
}
