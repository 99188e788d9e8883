// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared setup.

pub mod evaluate;
pub mod inspect;
pub mod locate;
pub mod run;

use runtime::TestbenchConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the configuration file, or falls back to the built-in defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<TestbenchConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            TestbenchConfig::from_file(path)
                .map_err(|e| anyhow::anyhow!("failed to load '{}': {e}", path.display()))
        }
        None => {
            tracing::debug!("no configuration file, using defaults");
            Ok(TestbenchConfig::default())
        }
    }
}

/// Builds a runtime on the simulated NPU and brings it up.
pub fn ready_runtime(
    config: &runtime::RuntimeConfig,
) -> anyhow::Result<runtime::ModelRuntime<runtime::Ready>> {
    let (npu, nvic) = accelerator::sim::simulated(config.npu.irq);
    let rt = runtime::ModelRuntime::new(config.clone(), Box::new(npu))
        .initialize(nvic.as_ref())?;
    Ok(rt)
}
