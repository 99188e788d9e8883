// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Type conversion kernels.

use crate::{QuantTensor, TensorError};

/// Dequantizes an int8 tensor into little-endian `f32` bytes.
///
/// The output is raw bytes because arena slots carry no alignment guarantee
/// for `f32`.
///
/// # Errors
/// Returns [`TensorError::BufferSizeMismatch`] if `output` is not exactly
/// four bytes per input element.
pub fn dequantize(input: &QuantTensor<'_>, output: &mut [u8]) -> Result<(), TensorError> {
    let expected = input.data().len() * 4;
    if output.len() != expected {
        return Err(TensorError::BufferSizeMismatch {
            expected,
            actual: output.len(),
        });
    }
    let q = input.quant();
    for (chunk, &v) in output.chunks_exact_mut(4).zip(input.data()) {
        chunk.copy_from_slice(&q.dequantize(v).to_le_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_f32_le, QuantParams, Shape};

    #[test]
    fn test_dequantize_to_bytes() {
        let shape = Shape::vector(2);
        let x = [-128i8, 0];
        let input = QuantTensor::new(&x, &shape, QuantParams::new(0.00390625, -128).unwrap()).unwrap();
        let mut out = [0u8; 8];
        dequantize(&input, &mut out).unwrap();
        assert_eq!(decode_f32_le(&out).unwrap(), vec![0.0, 0.5]);
        assert!(dequantize(&input, &mut out[..4]).is_err());
    }
}
