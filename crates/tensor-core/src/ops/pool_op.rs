// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized average pooling.

use super::{window_extent, FusedActivation, Padding};
use crate::{QuantTensor, QuantTensorMut, Shape, TensorError};

/// Options for [`avg_pool2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolParams {
    pub filter_h: usize,
    pub filter_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub activation: FusedActivation,
}

/// Average pooling over `[N, H, W, C]`.
///
/// Only taps inside the input are averaged, and the integer mean rounds half
/// away from zero. Input and output must share quantization parameters, so
/// the average is computed directly on stored values.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if the quantization differs and
/// [`TensorError::ShapeMismatch`] if the output shape is wrong.
pub fn avg_pool2d(
    input: &QuantTensor<'_>,
    params: &PoolParams,
    output: &mut QuantTensorMut<'_>,
) -> Result<(), TensorError> {
    const OP: &str = "avg_pool2d";
    if input.quant() != output.quant() {
        return Err(TensorError::InvalidArgument {
            op: OP,
            detail: format!(
                "input ({}) and output ({}) quantization must match",
                input.quant(),
                output.quant()
            ),
        });
    }
    let [n, ih, iw, c] = input.shape().as_nhwc(OP)?;
    let (oh, pad_h) = window_extent(OP, ih, params.filter_h, params.stride_h, params.padding)?;
    let (ow, pad_w) = window_extent(OP, iw, params.filter_w, params.stride_w, params.padding)?;
    let expected = Shape::nhwc(n, oh, ow, c);
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let range = params.activation.range(output.quant());
    let x = input.data();
    let y = output.data_mut();
    for b in 0..n {
        for oy in 0..oh {
            let y0 = (oy * params.stride_h).saturating_sub(pad_h);
            let y1 = (oy * params.stride_h + params.filter_h).saturating_sub(pad_h).min(ih);
            for ox in 0..ow {
                let x0 = (ox * params.stride_w).saturating_sub(pad_w);
                let x1 = (ox * params.stride_w + params.filter_w).saturating_sub(pad_w).min(iw);
                let count = ((y1 - y0) * (x1 - x0)) as i32;
                for ch in 0..c {
                    let mut sum = 0i32;
                    for iy in y0..y1 {
                        for ix in x0..x1 {
                            sum += i32::from(x[((b * ih + iy) * iw + ix) * c + ch]);
                        }
                    }
                    let avg = if count == 0 {
                        0
                    } else if sum >= 0 {
                        (sum + count / 2) / count
                    } else {
                        (sum - count / 2) / count
                    };
                    y[((b * oh + oy) * ow + ox) * c + ch] =
                        avg.clamp(i32::from(range.0), i32::from(range.1)) as i8;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuantParams;

    fn params(fh: usize, sh: usize) -> PoolParams {
        PoolParams {
            filter_h: fh,
            filter_w: 1,
            stride_h: sh,
            stride_w: 1,
            padding: Padding::Valid,
            activation: FusedActivation::None,
        }
    }

    #[test]
    fn test_global_average() {
        let q = QuantParams::new(0.1, -128).unwrap();
        let in_shape = Shape::nhwc(1, 4, 1, 2);
        let out_shape = Shape::nhwc(1, 1, 1, 2);
        let x = [1i8, -1, 2, -2, 3, -3, 5, -4];
        let mut y = [0i8; 2];
        let input = QuantTensor::new(&x, &in_shape, q).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, q).unwrap();
        avg_pool2d(&input, &params(4, 4), &mut output).unwrap();
        // 11/4 = 2.75 → 3; -10/4 = -2.5 → -3
        assert_eq!(y, [3, -3]);
    }

    #[test]
    fn test_sliding_window() {
        let q = QuantParams::new(1.0, 0).unwrap();
        let in_shape = Shape::nhwc(1, 4, 1, 1);
        let out_shape = Shape::nhwc(1, 3, 1, 1);
        let x = [0i8, 2, 4, 6];
        let mut y = [0i8; 3];
        let input = QuantTensor::new(&x, &in_shape, q).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, q).unwrap();
        avg_pool2d(&input, &params(2, 1), &mut output).unwrap();
        assert_eq!(y, [1, 3, 5]);
    }

    #[test]
    fn test_same_padding_averages_valid_taps_only() {
        let q = QuantParams::new(1.0, 0).unwrap();
        let in_shape = Shape::nhwc(1, 3, 1, 1);
        let x = [3i8, 6, 9];
        let mut y = [0i8; 3];
        let input = QuantTensor::new(&x, &in_shape, q).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &in_shape, q).unwrap();
        let p = PoolParams {
            padding: Padding::Same,
            ..params(3, 1)
        };
        avg_pool2d(&input, &p, &mut output).unwrap();
        // (3+6)/2 = 4.5 → 5, (3+6+9)/3 = 6, (6+9)/2 = 7.5 → 8
        assert_eq!(y, [5, 6, 8]);
    }

    #[test]
    fn test_rejects_requantizing_pool() {
        let in_shape = Shape::nhwc(1, 1, 1, 1);
        let x = [0i8];
        let mut y = [0i8];
        let input = QuantTensor::new(&x, &in_shape, QuantParams::new(1.0, 0).unwrap()).unwrap();
        let mut output =
            QuantTensorMut::new(&mut y, &in_shape, QuantParams::new(2.0, 0).unwrap()).unwrap();
        assert!(avg_pool2d(&input, &params(1, 1), &mut output).is_err());
    }
}
