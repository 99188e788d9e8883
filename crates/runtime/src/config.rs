// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime and test loop configuration loaded from TOML files or
//! constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! start_index = 0
//! max_index = 102400
//! result_prefix = "qdense_bulk_result_"
//! write_mode = "bulk"
//! progress_interval = 100
//!
//! [runtime]
//! arena_size = "125K"
//! # model_image = "./models/af_detect_v2_0_0.json"
//!
//! [runtime.npu]
//! irq = 0
//!
//! [dataset]
//! x_root = "blindfold_test_vectors"
//! num_samples = 1000000
//! ```

use crate::model_params::{self, ModelParams};
use crate::{RuntimeError, TestbenchError};
use accelerator::NpuConfig;
use dataset::DatasetConfig;
use memory_manager::ArenaCapacity;
use model_ir::ModelSource;
use std::path::{Path, PathBuf};

/// Configuration of one [`ModelRuntime`](crate::ModelRuntime).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Flash image to map instead of the embedded model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_image: Option<PathBuf>,
    /// Tensor arena size (human-readable, e.g. `"125K"`).
    #[serde(default = "default_arena_size")]
    pub arena_size: String,
    /// Input/output quantization used around the interpreter.
    #[serde(default = "default_quant")]
    pub quant: ModelParams,
    /// NPU bring-up parameters.
    #[serde(default)]
    pub npu: NpuConfig,
}

fn default_arena_size() -> String {
    "125K".to_string()
}

fn default_quant() -> ModelParams {
    model_params::ACTIVE
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_image: None,
            arena_size: default_arena_size(),
            quant: default_quant(),
            npu: NpuConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the arena size string into an [`ArenaCapacity`].
    pub fn arena_capacity(&self) -> Result<ArenaCapacity, RuntimeError> {
        ArenaCapacity::parse(&self.arena_size)
            .map_err(|e| RuntimeError::Config(format!("invalid arena size: {e}")))
    }

    /// Returns where the model image is loaded from.
    pub fn model_source(&self) -> ModelSource {
        match &self.model_image {
            Some(path) => ModelSource::Flash(path.clone()),
            None => ModelSource::Embedded(model_params::EMBEDDED_MODEL),
        }
    }
}

/// How results are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// 256-entry batch files of the first output value.
    #[default]
    Bulk,
    /// One file per sample holding the whole output vector.
    PerSample,
}

/// Full testbench configuration: loop parameters plus the runtime and
/// dataset sections.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TestbenchConfig {
    /// First index to scan from.
    #[serde(default)]
    pub start_index: u32,
    /// Stop once the next index to scan reaches this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_index: Option<u32>,
    /// File name prefix of result files.
    #[serde(default = "default_prefix")]
    pub result_prefix: String,
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Log progress whenever the loaded index is a multiple of this.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

fn default_prefix() -> String {
    "qdense_bulk_result_".to_string()
}

fn default_progress_interval() -> u32 {
    100
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        Self {
            start_index: 0,
            max_index: None,
            result_prefix: default_prefix(),
            write_mode: WriteMode::default(),
            progress_interval: default_progress_interval(),
            runtime: RuntimeConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl TestbenchConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TestbenchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TestbenchError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, TestbenchError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| TestbenchError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, TestbenchError> {
        toml::to_string_pretty(self)
            .map_err(|e| TestbenchError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks the loop parameters and the nested sections.
    pub fn validate(&self) -> Result<(), TestbenchError> {
        if self.progress_interval == 0 {
            return Err(TestbenchError::Config(
                "progress_interval must be at least 1".into(),
            ));
        }
        if self.result_prefix.is_empty() || self.result_prefix.contains('/') {
            return Err(TestbenchError::Config(format!(
                "result_prefix '{}' must be a non-empty file name prefix",
                self.result_prefix
            )));
        }
        self.runtime
            .arena_capacity()
            .map_err(|e| TestbenchError::Config(e.to_string()))?;
        self.dataset.validate()?;
        Ok(())
    }
}
