// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from an embedded byte array or a flash image file.
//!
//! On the board the image lives either in the firmware binary or in an
//! execute-in-place flash region. The host equivalents are a `&'static [u8]`
//! (typically `include_bytes!`) and a memory-mapped file.

use crate::graph::{Loaded, Validated};
use crate::{ModelError, ModelGraph, ModelImage};
use std::path::{Path, PathBuf};

/// Schema version this crate understands.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 3;

/// Where the model image comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Image bytes compiled into the binary.
    Embedded(&'static [u8]),
    /// Image file mapped read-only from storage.
    Flash(PathBuf),
}

impl ModelSource {
    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            ModelSource::Embedded(bytes) => format!("embedded ({} bytes)", bytes.len()),
            ModelSource::Flash(path) => format!("flash image {}", path.display()),
        }
    }
}

/// Loads model images into [`ModelGraph`]s.
///
/// # Example
/// ```no_run
/// use model_ir::{ModelLoader, ModelSource};
///
/// let graph = ModelLoader::load(&ModelSource::Flash("./model.json".into())).unwrap();
/// println!("{}", graph.summary());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Parses the image without checking the schema version or validating.
    pub fn open(source: &ModelSource) -> Result<ModelGraph<Loaded>, ModelError> {
        let image = match source {
            ModelSource::Embedded(bytes) => ModelImage::from_slice(bytes)?,
            ModelSource::Flash(path) => Self::map_file(path)?,
        };
        tracing::debug!(
            source = %source.describe(),
            version = image.version,
            "model image parsed"
        );
        Ok(ModelGraph::new(image))
    }

    /// Parses, checks the schema version, and validates.
    pub fn load(source: &ModelSource) -> Result<ModelGraph<Validated>, ModelError> {
        let graph = Self::open(source)?;
        Self::check_version(graph.version())?;
        graph.validate()
    }

    /// Fails unless `found` equals [`SUPPORTED_SCHEMA_VERSION`].
    pub fn check_version(found: u32) -> Result<(), ModelError> {
        if found != SUPPORTED_SCHEMA_VERSION {
            return Err(ModelError::SchemaMismatch {
                found,
                supported: SUPPORTED_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    fn map_file(path: &Path) -> Result<ModelImage, ModelError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; the parsed image owns copies of everything it needs.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        ModelImage::from_slice(&mmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "version": 3,
        "description": "minimal",
        "tensors": [
            {"name": "in", "shape": [1, 2], "dtype": "i8", "quant": {"scale": 0.5, "zero_point": 0}},
            {"name": "out", "shape": [1, 2], "dtype": "i8", "quant": {"scale": 0.5, "zero_point": 0}}
        ],
        "operators": [{"op": "relu6", "inputs": [0], "outputs": [1]}],
        "inputs": [0],
        "outputs": [1]
    }"#;

    #[test]
    fn test_load_embedded() {
        let g = ModelLoader::load(&ModelSource::Embedded(MINIMAL.as_bytes())).unwrap();
        assert_eq!(g.description(), "minimal");
        assert_eq!(g.num_steps(), 1);
    }

    #[test]
    fn test_load_flash_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let g = ModelLoader::load(&ModelSource::Flash(file.path().to_path_buf())).unwrap();
        assert_eq!(g.output(), 1);
    }

    #[test]
    fn test_schema_mismatch() {
        let json = MINIMAL.replace("\"version\": 3", "\"version\": 2");
        let leaked: &'static str = Box::leak(json.into_boxed_str());
        let err = ModelLoader::load(&ModelSource::Embedded(leaked.as_bytes())).unwrap_err();
        assert!(matches!(
            err,
            ModelError::SchemaMismatch {
                found: 2,
                supported: 3
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ModelLoader::open(&ModelSource::Flash("/nonexistent/model.json".into()));
        assert!(matches!(err, Err(ModelError::ImageRead(_))));
    }

    #[test]
    fn test_malformed_json() {
        let err = ModelLoader::open(&ModelSource::Embedded(b"{ not json"));
        assert!(matches!(err, Err(ModelError::ImageParse(_))));
    }
}
