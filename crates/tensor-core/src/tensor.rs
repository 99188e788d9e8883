// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Borrowed quantized tensor views and byte-level helpers.
//!
//! Tensors never own their storage here: variable tensors live in the
//! runtime's arena and constants live in the model image. A view pairs a
//! slice of that storage with its [`Shape`] and [`QuantParams`].

use crate::{QuantParams, Shape, TensorError};

/// An immutable int8 tensor view.
#[derive(Debug, Clone, Copy)]
pub struct QuantTensor<'a> {
    data: &'a [i8],
    shape: &'a Shape,
    quant: QuantParams,
}

impl<'a> QuantTensor<'a> {
    /// Creates a view, checking that `data` holds exactly `shape.num_elements()` values.
    pub fn new(data: &'a [i8], shape: &'a Shape, quant: QuantParams) -> Result<Self, TensorError> {
        check_len(data.len(), shape)?;
        Ok(Self { data, shape, quant })
    }

    /// Returns the underlying values.
    pub fn data(&self) -> &'a [i8] {
        self.data
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the quantization parameters.
    pub fn quant(&self) -> QuantParams {
        self.quant
    }
}

/// A mutable int8 tensor view, used for kernel outputs.
#[derive(Debug)]
pub struct QuantTensorMut<'a> {
    data: &'a mut [i8],
    shape: &'a Shape,
    quant: QuantParams,
}

impl<'a> QuantTensorMut<'a> {
    /// Creates a mutable view, checking the element count against `shape`.
    pub fn new(
        data: &'a mut [i8],
        shape: &'a Shape,
        quant: QuantParams,
    ) -> Result<Self, TensorError> {
        check_len(data.len(), shape)?;
        Ok(Self { data, shape, quant })
    }

    /// Returns the values for writing.
    pub fn data_mut(&mut self) -> &mut [i8] {
        self.data
    }

    /// Returns the values for reading.
    pub fn data(&self) -> &[i8] {
        self.data
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the quantization parameters.
    pub fn quant(&self) -> QuantParams {
        self.quant
    }
}

fn check_len(len: usize, shape: &Shape) -> Result<(), TensorError> {
    let expected = shape.num_elements();
    if len != expected {
        return Err(TensorError::BufferSizeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Reinterprets raw arena bytes as int8 values.
pub fn as_i8(bytes: &[u8]) -> &[i8] {
    bytemuck::cast_slice(bytes)
}

/// Reinterprets raw arena bytes as mutable int8 values.
pub fn as_i8_mut(bytes: &mut [u8]) -> &mut [i8] {
    bytemuck::cast_slice_mut(bytes)
}

/// Decodes little-endian `i32` values (bias tensors).
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if the length is not a multiple of 4.
pub fn decode_i32_le(bytes: &[u8]) -> Result<Vec<i32>, TensorError> {
    word_chunks(bytes, "decode_i32")
        .map(|chunks| chunks.map(i32::from_le_bytes).collect())
}

/// Decodes little-endian `f32` values (sample files, dequantized outputs).
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if the length is not a multiple of 4.
pub fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f32>, TensorError> {
    word_chunks(bytes, "decode_f32")
        .map(|chunks| chunks.map(f32::from_le_bytes).collect())
}

fn word_chunks<'a>(
    bytes: &'a [u8],
    op: &'static str,
) -> Result<impl Iterator<Item = [u8; 4]> + 'a, TensorError> {
    if bytes.len() % 4 != 0 {
        return Err(TensorError::InvalidArgument {
            op,
            detail: format!("{} bytes is not a whole number of 4-byte words", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]]))
}
