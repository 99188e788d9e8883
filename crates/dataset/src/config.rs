// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dataset layout configuration.
//!
//! # TOML Format
//! ```toml
//! x_root = "blindfold_test_vectors"
//! y_root = "blindfold_test_vectors"
//! num_samples = 1000000
//! timesteps = 40
//! features = 1
//! read_ground_truth = false
//! strict_scan = false
//! ```

use crate::shard::MAX_INDEX_SPACE;
use crate::LoadError;
use std::path::Path;

/// Directory both roots default to.
pub const DEFAULT_ROOT: &str = "blindfold_test_vectors";

/// Where samples live and how they are shaped.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root of the `x_test_*` feature files.
    pub x_root: String,
    /// Root of the `y_test_*` label files.
    pub y_root: String,
    /// Root results are written under. Defaults to `x_root`.
    pub result_root: Option<String>,
    /// Size `N` of the index space `[0, N)`.
    pub num_samples: u32,
    /// Time steps per sample.
    pub timesteps: usize,
    /// Features per time step.
    pub features: usize,
    /// Also read `y_test_*` for every loaded sample.
    pub read_ground_truth: bool,
    /// Surface storage errors other than "not found" instead of skipping the index.
    pub strict_scan: bool,
    /// Create missing roots when mounting.
    pub create_roots: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            x_root: DEFAULT_ROOT.to_string(),
            y_root: DEFAULT_ROOT.to_string(),
            result_root: None,
            num_samples: 1_000_000,
            timesteps: 40,
            features: 1,
            read_ground_truth: false,
            strict_scan: false,
            create_roots: true,
        }
    }
}

impl DatasetConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoadError::InvalidConfig(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| LoadError::InvalidConfig(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, LoadError> {
        toml::to_string_pretty(self)
            .map_err(|e| LoadError::InvalidConfig(format!("TOML serialise error: {e}")))
    }

    /// Checks the sample shape and index-space bounds.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.num_samples > MAX_INDEX_SPACE {
            return Err(LoadError::InvalidConfig(format!(
                "num_samples {} exceeds the {MAX_INDEX_SPACE} indices a shard prefix can address",
                self.num_samples
            )));
        }
        if self.sample_len() == 0 {
            return Err(LoadError::InvalidConfig(
                "timesteps and features must both be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Number of `f32` values per sample.
    pub fn sample_len(&self) -> usize {
        self.timesteps * self.features
    }

    /// Size of one `x_test_*` file in bytes.
    pub fn sample_bytes(&self) -> usize {
        self.sample_len() * std::mem::size_of::<f32>()
    }

    /// Root results are written under.
    pub fn result_root(&self) -> &str {
        self.result_root.as_deref().unwrap_or(&self.x_root)
    }
}
