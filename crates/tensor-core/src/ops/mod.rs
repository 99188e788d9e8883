// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference int8 kernels.
//!
//! Each kernel writes into a pre-allocated output slice so the inference
//! hot path never allocates tensor storage. Activations are NHWC.
//! Layout kernels are element-type agnostic and operate on raw bytes.

mod activation_op;
mod conv_op;
mod convert_op;
mod layout_op;
mod pool_op;
mod softmax_op;

pub use activation_op::relu6;
pub use conv_op::{conv2d, depthwise_conv2d, Conv2dParams, DepthwiseParams};
pub use convert_op::dequantize;
pub use layout_op::{fill, pack, reshape, strided_slice, SliceParams};
pub use pool_op::{avg_pool2d, PoolParams};
pub use softmax_op::softmax;

use crate::{QuantParams, TensorError};

/// Spatial padding scheme for windowed operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Output covers `ceil(in / stride)` positions; missing taps read as zero.
    Same,
    /// Only windows fully inside the input are computed.
    #[default]
    Valid,
}

/// Activation folded into a kernel's output requantization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusedActivation {
    #[default]
    None,
    Relu,
    Relu6,
}

impl FusedActivation {
    /// Returns the int8 clamp range this activation imposes under `quant`.
    pub fn range(self, quant: QuantParams) -> (i8, i8) {
        match self {
            FusedActivation::None => (i8::MIN, i8::MAX),
            FusedActivation::Relu => (quant.quantize(0.0).value, i8::MAX),
            FusedActivation::Relu6 => quant.quantized_range(0.0, 6.0),
        }
    }
}

/// Output extent and leading pad for one spatial axis.
pub(crate) fn window_extent(
    op: &'static str,
    input: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
) -> Result<(usize, usize), TensorError> {
    if stride == 0 || kernel == 0 {
        return Err(TensorError::InvalidArgument {
            op,
            detail: "kernel size and stride must be non-zero".into(),
        });
    }
    match padding {
        Padding::Valid => {
            if kernel > input {
                return Err(TensorError::InvalidArgument {
                    op,
                    detail: format!("kernel {kernel} larger than input {input} with valid padding"),
                });
            }
            Ok(((input - kernel) / stride + 1, 0))
        }
        Padding::Same => {
            let out = input.div_ceil(stride);
            let needed = (out - 1) * stride + kernel;
            let pad_total = needed.saturating_sub(input);
            Ok((out, pad_total / 2))
        }
    }
}
