// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator definitions for the model image.
//!
//! Each [`OperatorDef`] names an [`Operator`] (with its options) and the
//! tensor indices it reads and writes. The `npu_offload` operator carries a
//! nested list of operators that the accelerator executes as one job.

use std::fmt;
use std::ops::RangeInclusive;
use tensor_core::{Conv2dParams, DepthwiseParams, PoolParams, SliceParams};

/// An operator and its build-time options.
///
/// Serialized externally tagged in snake_case, e.g. `"relu6"` or
/// `{"softmax": {"beta": 1.0}}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Conv2d(Conv2dParams),
    DepthwiseConv2d(DepthwiseParams),
    Relu6,
    AveragePool2d(PoolParams),
    Reshape,
    Softmax {
        #[serde(default = "unit_beta")]
        beta: f32,
    },
    Dequantize,
    StridedSlice(SliceParams),
    Pack {
        #[serde(default)]
        axis: usize,
    },
    Fill,
    /// A sub-graph executed on the accelerator.
    NpuOffload { operators: Vec<OperatorDef> },
}

fn unit_beta() -> f32 {
    1.0
}

/// Fieldless operator kind, used for registration and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    Conv2d,
    DepthwiseConv2d,
    Relu6,
    AveragePool2d,
    Reshape,
    Softmax,
    Dequantize,
    StridedSlice,
    Pack,
    Fill,
    NpuOffload,
}

impl OpCode {
    /// Every operator kind the image format can express.
    pub const ALL: [OpCode; 11] = [
        OpCode::DepthwiseConv2d,
        OpCode::Relu6,
        OpCode::Conv2d,
        OpCode::AveragePool2d,
        OpCode::Reshape,
        OpCode::Softmax,
        OpCode::Dequantize,
        OpCode::StridedSlice,
        OpCode::Pack,
        OpCode::Fill,
        OpCode::NpuOffload,
    ];

    /// Returns the snake_case name used in model images.
    pub fn as_str(self) -> &'static str {
        match self {
            OpCode::Conv2d => "conv2d",
            OpCode::DepthwiseConv2d => "depthwise_conv2d",
            OpCode::Relu6 => "relu6",
            OpCode::AveragePool2d => "average_pool2d",
            OpCode::Reshape => "reshape",
            OpCode::Softmax => "softmax",
            OpCode::Dequantize => "dequantize",
            OpCode::StridedSlice => "strided_slice",
            OpCode::Pack => "pack",
            OpCode::Fill => "fill",
            OpCode::NpuOffload => "npu_offload",
        }
    }

    /// Accepted number of input tensors.
    ///
    /// Convolutions take an optional bias, reshape an optional shape tensor
    /// and fill an optional dims tensor ahead of its value.
    pub fn input_arity(self) -> RangeInclusive<usize> {
        match self {
            OpCode::Conv2d | OpCode::DepthwiseConv2d => 2..=3,
            OpCode::Reshape | OpCode::Fill => 1..=2,
            OpCode::Pack | OpCode::NpuOffload => 1..=usize::MAX,
            OpCode::Relu6
            | OpCode::AveragePool2d
            | OpCode::Softmax
            | OpCode::Dequantize
            | OpCode::StridedSlice => 1..=1,
        }
    }

    /// Accepted number of output tensors.
    pub fn output_arity(self) -> RangeInclusive<usize> {
        match self {
            OpCode::NpuOffload => 1..=usize::MAX,
            _ => 1..=1,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operator {
    /// Returns the operator's kind.
    pub fn code(&self) -> OpCode {
        match self {
            Operator::Conv2d(_) => OpCode::Conv2d,
            Operator::DepthwiseConv2d(_) => OpCode::DepthwiseConv2d,
            Operator::Relu6 => OpCode::Relu6,
            Operator::AveragePool2d(_) => OpCode::AveragePool2d,
            Operator::Reshape => OpCode::Reshape,
            Operator::Softmax { .. } => OpCode::Softmax,
            Operator::Dequantize => OpCode::Dequantize,
            Operator::StridedSlice(_) => OpCode::StridedSlice,
            Operator::Pack { .. } => OpCode::Pack,
            Operator::Fill => OpCode::Fill,
            Operator::NpuOffload { .. } => OpCode::NpuOffload,
        }
    }
}

/// One node of the model graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OperatorDef {
    pub op: Operator,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

impl OperatorDef {
    /// Returns the nested operators of an offload node, or an empty slice.
    pub fn offloaded(&self) -> &[OperatorDef] {
        match &self.op {
            Operator::NpuOffload { operators } => operators,
            _ => &[],
        }
    }

    /// Returns a one-line description such as `conv2d [1, 2, 3] -> [4]`.
    pub fn summary(&self) -> String {
        format!("{} {:?} -> {:?}", self.op.code(), self.inputs, self.outputs)
    }
}
