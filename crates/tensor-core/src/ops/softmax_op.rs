// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized softmax.

use crate::{QuantTensor, QuantTensorMut, TensorError};

/// Computes softmax along the last dimension:
/// `y[i] = exp(beta * (x[i] - max)) / Σ exp(beta * (x - max))`.
///
/// Inputs are dequantized, the numerically stable form subtracts the row
/// maximum before exponentiation, and probabilities are quantized into the
/// output's parameters (typically `scale = 1/256, zero_point = -128`).
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn softmax(
    input: &QuantTensor<'_>,
    beta: f32,
    output: &mut QuantTensorMut<'_>,
) -> Result<(), TensorError> {
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "softmax",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let row_len = input.shape().dims().last().copied().unwrap_or(1);
    if row_len == 0 {
        return Ok(());
    }

    let in_q = input.quant();
    let out_q = output.quant();
    let src = input.data();
    let dst = output.data_mut();
    let mut exps = vec![0.0f32; row_len];

    for (row_src, row_dst) in src.chunks_exact(row_len).zip(dst.chunks_exact_mut(row_len)) {
        let max_val = row_src
            .iter()
            .map(|&q| in_q.dequantize(q))
            .fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for (e, &q) in exps.iter_mut().zip(row_src) {
            *e = (beta * (in_q.dequantize(q) - max_val)).exp();
            sum += *e;
        }

        let inv_sum = 1.0 / sum;
        for (d, &e) in row_dst.iter_mut().zip(&exps) {
            *d = out_q.quantize(e * inv_sum).value;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QuantParams, Shape};

    fn prob_q() -> QuantParams {
        QuantParams::new(1.0 / 256.0, -128).unwrap()
    }

    #[test]
    fn test_softmax_uniform() {
        let shape = Shape::new(vec![1, 4]);
        let x = [7i8; 4];
        let mut y = [0i8; 4];
        let input = QuantTensor::new(&x, &shape, QuantParams::new(0.1, 0).unwrap()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &shape, prob_q()).unwrap();
        softmax(&input, 1.0, &mut output).unwrap();
        // 0.25 * 256 - 128 = -64
        assert_eq!(y, [-64; 4]);
    }

    #[test]
    fn test_softmax_two_class() {
        let shape = Shape::new(vec![1, 2]);
        // Logits 0.0 and ln(3) ≈ 1.1 give probabilities 0.25 / 0.75.
        let x = [0i8, 11];
        let mut y = [0i8; 2];
        let input = QuantTensor::new(&x, &shape, QuantParams::new(0.1, 0).unwrap()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &shape, prob_q()).unwrap();
        softmax(&input, 1.0, &mut output).unwrap();
        let q = prob_q();
        let p0 = q.dequantize(y[0]);
        let p1 = q.dequantize(y[1]);
        assert!((p0 + p1 - 1.0).abs() <= 2.0 * q.scale);
        assert!(p1 > p0);
        assert!((p1 - 0.75).abs() < 0.01, "p1 = {p1}");
    }

    #[test]
    fn test_softmax_row_wise() {
        let shape = Shape::new(vec![2, 2]);
        let x = [0i8, 0, -100, 100];
        let mut y = [0i8; 4];
        let input = QuantTensor::new(&x, &shape, QuantParams::new(0.1, 0).unwrap()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &shape, prob_q()).unwrap();
        softmax(&input, 1.0, &mut output).unwrap();
        assert_eq!(&y[..2], &[0, 0]);
        // Certain class saturates at the top of the int8 range.
        assert_eq!(y[2], -128);
        assert_eq!(y[3], 127);
    }

    #[test]
    fn test_softmax_shape_mismatch() {
        let a = Shape::vector(2);
        let b = Shape::vector(3);
        let x = [0i8; 2];
        let mut y = [0i8; 3];
        let input = QuantTensor::new(&x, &a, prob_q()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &b, prob_q()).unwrap();
        assert!(softmax(&input, 1.0, &mut output).is_err());
    }
}
