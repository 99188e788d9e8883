// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Quantized tensor primitives for the NPU testbench.
//!
//! This crate provides:
//! - [`QuantParams`]: per-tensor affine quantization (`real = (q - zp) * scale`)
//!   with round-half-away-from-zero, saturating quantization.
//! - [`QuantTensor`] / [`QuantTensorMut`]: borrowed int8 views over arena or
//!   constant memory, paired with a [`Shape`] and quantization parameters.
//! - [`DType`]: element types the model image can declare (i8, i32, f32).
//! - Reference int8 kernels: convolution, depthwise convolution, average
//!   pooling, ReLU6, softmax, dequantize and the layout ops (reshape, strided
//!   slice, pack, fill).
//!
//! # Design Goals
//! - Kernels write into pre-allocated output slices; nothing allocates in the
//!   per-inference path except small index tables.
//! - Layouts are NHWC, matching what the offline converter emits.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod ops;
mod quant;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    avg_pool2d, conv2d, depthwise_conv2d, dequantize, fill, pack, relu6, reshape, softmax,
    strided_slice, Conv2dParams, DepthwiseParams, FusedActivation, Padding, PoolParams,
    SliceParams,
};
pub use quant::{requantize, QuantParams, Quantized};
pub use shape::Shape;
pub use tensor::{as_i8, as_i8_mut, decode_f32_le, decode_i32_le, QuantTensor, QuantTensorMut};
