// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model image loading and graph validation.

use crate::OpCode;

/// Errors that can occur when loading or validating a model image.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model image file could not be opened or mapped.
    #[error("failed to read model image: {0}")]
    ImageRead(#[from] std::io::Error),

    /// The model image JSON is malformed.
    #[error("failed to parse model image: {0}")]
    ImageParse(#[from] serde_json::Error),

    /// The image was produced for a different schema version.
    #[error("model schema version {found} is not supported (expected {supported})")]
    SchemaMismatch { found: u32, supported: u32 },

    /// A tensor definition is inconsistent (data length, dtype, quantization).
    #[error("invalid tensor {index} '{name}': {detail}")]
    InvalidTensor {
        index: usize,
        name: String,
        detail: String,
    },

    /// An operator references tensors it cannot use.
    #[error("invalid operator #{index} ({op}): {detail}")]
    InvalidOperator {
        index: usize,
        op: OpCode,
        detail: String,
    },

    /// The graph as a whole is malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}
