// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for quantization and kernel execution.

use crate::Shape;

/// Errors that can occur during quantization or kernel execution.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A buffer's length does not match the length its shape requires.
    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// Quantization parameters violate `scale > 0`.
    #[error("invalid quantization scale {scale} (must be finite and > 0)")]
    InvalidScale { scale: f32 },

    /// An operator received arguments it cannot handle.
    #[error("invalid argument for {op}: {detail}")]
    InvalidArgument { op: &'static str, detail: String },
}
