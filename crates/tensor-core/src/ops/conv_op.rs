// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized 2-D convolution and depthwise convolution.
//!
//! Accumulation is exact in `i32`:
//!
//! ```text
//! acc = bias[oc] + Σ (x - x_zp) * (w - w_zp)
//! y   = clamp(round(acc * x_scale * w_scale / y_scale) + y_zp, activation)
//! ```
//!
//! Taps that fall into the padding region contribute nothing, which is the
//! same as padding with the input zero point.

use super::{window_extent, FusedActivation, Padding};
use crate::{requantize, QuantTensor, QuantTensorMut, Shape, TensorError};

/// Options for [`conv2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Conv2dParams {
    pub stride_h: usize,
    pub stride_w: usize,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub activation: FusedActivation,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            stride_h: 1,
            stride_w: 1,
            padding: Padding::Valid,
            activation: FusedActivation::None,
        }
    }
}

/// Options for [`depthwise_conv2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthwiseParams {
    pub stride_h: usize,
    pub stride_w: usize,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub activation: FusedActivation,
    #[serde(default = "one")]
    pub depth_multiplier: usize,
}

fn one() -> usize {
    1
}

impl Default for DepthwiseParams {
    fn default() -> Self {
        Self {
            stride_h: 1,
            stride_w: 1,
            padding: Padding::Valid,
            activation: FusedActivation::None,
            depth_multiplier: 1,
        }
    }
}

/// Standard convolution.
///
/// Shapes: input `[N, H, W, Cin]`, filter `[Cout, KH, KW, Cin]`,
/// bias `[Cout]` (optional), output `[N, OH, OW, Cout]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the shapes are inconsistent
/// with each other or with `params`.
pub fn conv2d(
    input: &QuantTensor<'_>,
    filter: &QuantTensor<'_>,
    bias: Option<&[i32]>,
    params: &Conv2dParams,
    output: &mut QuantTensorMut<'_>,
) -> Result<(), TensorError> {
    const OP: &str = "conv2d";
    let [n, ih, iw, ic] = input.shape().as_nhwc(OP)?;
    let [oc, kh, kw, fc] = filter.shape().as_nhwc(OP)?;
    if fc != ic {
        return Err(shape_mismatch(OP, input.shape(), filter.shape()));
    }
    let (oh, pad_h) = window_extent(OP, ih, kh, params.stride_h, params.padding)?;
    let (ow, pad_w) = window_extent(OP, iw, kw, params.stride_w, params.padding)?;
    let expected = Shape::nhwc(n, oh, ow, oc);
    if output.shape() != &expected {
        return Err(shape_mismatch(OP, &expected, output.shape()));
    }
    check_bias(OP, bias, oc)?;

    let x = input.data();
    let w = filter.data();
    let x_zp = input.quant().zero_point;
    let w_zp = filter.quant().zero_point;
    let multiplier = rescale(input, filter, output);
    let out_q = output.quant();
    let range = params.activation.range(out_q);
    let y = output.data_mut();

    for b in 0..n {
        for oy in 0..oh {
            for ox in 0..ow {
                for o in 0..oc {
                    let mut acc = bias.map_or(0, |bias| bias[o]);
                    for ky in 0..kh {
                        let Some(iy) = tap(oy, ky, params.stride_h, pad_h, ih) else {
                            continue;
                        };
                        for kx in 0..kw {
                            let Some(ix) = tap(ox, kx, params.stride_w, pad_w, iw) else {
                                continue;
                            };
                            let x_base = ((b * ih + iy) * iw + ix) * ic;
                            let w_base = ((o * kh + ky) * kw + kx) * ic;
                            for c in 0..ic {
                                let xv = i32::from(x[x_base + c]) - x_zp;
                                let wv = i32::from(w[w_base + c]) - w_zp;
                                acc += xv * wv;
                            }
                        }
                    }
                    y[((b * oh + oy) * ow + ox) * oc + o] =
                        requantize(acc, multiplier, out_q.zero_point, range);
                }
            }
        }
    }
    Ok(())
}

/// Depthwise convolution.
///
/// Shapes: input `[N, H, W, C]`, filter `[1, KH, KW, C * M]`,
/// bias `[C * M]` (optional), output `[N, OH, OW, C * M]` where `M` is the
/// depth multiplier. Output channel `c * M + m` reads input channel `c`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if the shapes are inconsistent.
pub fn depthwise_conv2d(
    input: &QuantTensor<'_>,
    filter: &QuantTensor<'_>,
    bias: Option<&[i32]>,
    params: &DepthwiseParams,
    output: &mut QuantTensorMut<'_>,
) -> Result<(), TensorError> {
    const OP: &str = "depthwise_conv2d";
    let [n, ih, iw, ic] = input.shape().as_nhwc(OP)?;
    let [one, kh, kw, fc] = filter.shape().as_nhwc(OP)?;
    let m = params.depth_multiplier;
    if one != 1 || m == 0 || fc != ic * m {
        return Err(shape_mismatch(OP, input.shape(), filter.shape()));
    }
    let (oh, pad_h) = window_extent(OP, ih, kh, params.stride_h, params.padding)?;
    let (ow, pad_w) = window_extent(OP, iw, kw, params.stride_w, params.padding)?;
    let expected = Shape::nhwc(n, oh, ow, fc);
    if output.shape() != &expected {
        return Err(shape_mismatch(OP, &expected, output.shape()));
    }
    check_bias(OP, bias, fc)?;

    let x = input.data();
    let w = filter.data();
    let x_zp = input.quant().zero_point;
    let w_zp = filter.quant().zero_point;
    let multiplier = rescale(input, filter, output);
    let out_q = output.quant();
    let range = params.activation.range(out_q);
    let y = output.data_mut();

    for b in 0..n {
        for oy in 0..oh {
            for ox in 0..ow {
                for c in 0..ic {
                    for mi in 0..m {
                        let o = c * m + mi;
                        let mut acc = bias.map_or(0, |bias| bias[o]);
                        for ky in 0..kh {
                            let Some(iy) = tap(oy, ky, params.stride_h, pad_h, ih) else {
                                continue;
                            };
                            for kx in 0..kw {
                                let Some(ix) = tap(ox, kx, params.stride_w, pad_w, iw) else {
                                    continue;
                                };
                                let xv = i32::from(x[((b * ih + iy) * iw + ix) * ic + c]) - x_zp;
                                let wv = i32::from(w[(ky * kw + kx) * fc + o]) - w_zp;
                                acc += xv * wv;
                            }
                        }
                        y[((b * oh + oy) * ow + ox) * fc + o] =
                            requantize(acc, multiplier, out_q.zero_point, range);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Maps an output position and kernel tap to an input coordinate, or `None`
/// when the tap lands in padding.
#[inline]
fn tap(out: usize, k: usize, stride: usize, pad: usize, extent: usize) -> Option<usize> {
    (out * stride + k).checked_sub(pad).filter(|&i| i < extent)
}

fn rescale(input: &QuantTensor<'_>, filter: &QuantTensor<'_>, output: &QuantTensorMut<'_>) -> f64 {
    f64::from(input.quant().scale) * f64::from(filter.quant().scale)
        / f64::from(output.quant().scale)
}

fn check_bias(op: &'static str, bias: Option<&[i32]>, channels: usize) -> Result<(), TensorError> {
    match bias {
        Some(b) if b.len() != channels => Err(TensorError::InvalidArgument {
            op,
            detail: format!("bias has {} entries for {channels} output channels", b.len()),
        }),
        _ => Ok(()),
    }
}

fn shape_mismatch(op: &'static str, lhs: &Shape, rhs: &Shape) -> TensorError {
    TensorError::ShapeMismatch {
        op,
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuantParams;

    fn unit() -> QuantParams {
        QuantParams::new(1.0, 0).unwrap()
    }

    #[test]
    fn test_conv2d_strided_valid() {
        // 1-D signal laid out as [1, 5, 1, 1], kernel 3 along H, stride 2.
        let in_shape = Shape::nhwc(1, 5, 1, 1);
        let f_shape = Shape::nhwc(1, 3, 1, 1);
        let out_shape = Shape::nhwc(1, 2, 1, 1);
        let x = [1i8, 2, 3, 4, 5];
        let w = [1i8, 0, -1];
        let mut y = [0i8; 2];

        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, unit()).unwrap();
        let params = Conv2dParams {
            stride_h: 2,
            ..Default::default()
        };
        conv2d(&input, &filter, Some(&[10]), &params, &mut output).unwrap();
        // (1 - 3) + 10, (3 - 5) + 10
        assert_eq!(y, [8, 8]);
    }

    #[test]
    fn test_conv2d_zero_points_and_relu6() {
        let in_q = QuantParams::new(0.5, -10).unwrap();
        let w_q = QuantParams::new(0.25, 0).unwrap();
        let out_q = QuantParams::new(0.1, 0).unwrap();
        let in_shape = Shape::nhwc(1, 1, 1, 2);
        let f_shape = Shape::nhwc(2, 1, 1, 2);
        let out_shape = Shape::nhwc(1, 1, 1, 2);
        // Real input [2.0, 4.0].
        let x = [-6i8, -2];
        // Filter 0 = [1.0, 1.0], filter 1 = [-1.0, 0.0].
        let w = [4i8, 4, -4, 0];
        let mut y = [0i8; 2];

        let input = QuantTensor::new(&x, &in_shape, in_q).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, w_q).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, out_q).unwrap();
        let params = Conv2dParams {
            activation: FusedActivation::Relu6,
            ..Default::default()
        };
        conv2d(&input, &filter, None, &params, &mut output).unwrap();
        // 6.0 → 60; -2.0 clamps to 0.
        assert_eq!(y, [60, 0]);
    }

    #[test]
    fn test_conv2d_same_padding() {
        let in_shape = Shape::nhwc(1, 3, 1, 1);
        let f_shape = Shape::nhwc(1, 3, 1, 1);
        let out_shape = Shape::nhwc(1, 3, 1, 1);
        let x = [1i8, 2, 3];
        let w = [1i8, 1, 1];
        let mut y = [0i8; 3];

        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, unit()).unwrap();
        let params = Conv2dParams {
            padding: Padding::Same,
            ..Default::default()
        };
        conv2d(&input, &filter, None, &params, &mut output).unwrap();
        assert_eq!(y, [3, 6, 5]);
    }

    #[test]
    fn test_conv2d_rejects_wrong_output_shape() {
        let in_shape = Shape::nhwc(1, 4, 1, 1);
        let f_shape = Shape::nhwc(1, 2, 1, 1);
        let bad = Shape::nhwc(1, 4, 1, 1);
        let x = [0i8; 4];
        let w = [0i8; 2];
        let mut y = [0i8; 4];

        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &bad, unit()).unwrap();
        let err = conv2d(&input, &filter, None, &Conv2dParams::default(), &mut output);
        assert!(matches!(err, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_depthwise_per_channel() {
        // Two channels, kernel 2 along H, each channel has its own filter.
        let in_shape = Shape::nhwc(1, 3, 1, 2);
        let f_shape = Shape::nhwc(1, 2, 1, 2);
        let out_shape = Shape::nhwc(1, 2, 1, 2);
        let x = [1i8, 10, 2, 20, 3, 30];
        let w = [1i8, 1, 1, -1];
        let mut y = [0i8; 4];

        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, unit()).unwrap();
        depthwise_conv2d(
            &input,
            &filter,
            Some(&[0, 1]),
            &DepthwiseParams::default(),
            &mut output,
        )
        .unwrap();
        // ch0: 1+2, 2+3; ch1: 10-20+1, 20-30+1
        assert_eq!(y, [3, -9, 5, -9]);
    }

    #[test]
    fn test_depthwise_multiplier() {
        let in_shape = Shape::nhwc(1, 1, 1, 1);
        let f_shape = Shape::nhwc(1, 1, 1, 2);
        let out_shape = Shape::nhwc(1, 1, 1, 2);
        let x = [3i8];
        let w = [2i8, -1];
        let mut y = [0i8; 2];

        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &out_shape, unit()).unwrap();
        let params = DepthwiseParams {
            depth_multiplier: 2,
            ..Default::default()
        };
        depthwise_conv2d(&input, &filter, None, &params, &mut output).unwrap();
        assert_eq!(y, [6, -3]);
    }

    #[test]
    fn test_bias_length_checked() {
        let in_shape = Shape::nhwc(1, 1, 1, 1);
        let f_shape = Shape::nhwc(1, 1, 1, 1);
        let x = [1i8];
        let w = [1i8];
        let mut y = [0i8];
        let input = QuantTensor::new(&x, &in_shape, unit()).unwrap();
        let filter = QuantTensor::new(&w, &f_shape, unit()).unwrap();
        let mut output = QuantTensorMut::new(&mut y, &in_shape, unit()).unwrap();
        let err = conv2d(&input, &filter, Some(&[1, 2]), &Conv2dParams::default(), &mut output);
        assert!(err.is_err());
    }
}
