// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialized model image.
//!
//! The offline converter emits one JSON document per model variant:
//!
//! ```json
//! {
//!   "version": 3,
//!   "description": "af-detect v2.0.0",
//!   "tensors": [
//!     { "name": "input", "shape": [1, 40], "dtype": "i8",
//!       "quant": { "scale": 1.7476615, "zero_point": -17 } },
//!     { "name": "conv/bias", "shape": [4], "dtype": "i32",
//!       "data": { "i32": [12, -3, 0, 7] } }
//!   ],
//!   "operators": [
//!     { "op": "reshape", "inputs": [0], "outputs": [1] }
//!   ],
//!   "inputs": [0],
//!   "outputs": [14]
//! }
//! ```
//!
//! Tensors with `data` are constants and never occupy arena space.

use crate::{ModelError, OperatorDef};
use tensor_core::{DType, QuantParams, Shape};

/// Top-level model image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelImage {
    /// Schema version the image was written against.
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub tensors: Vec<TensorDef>,
    pub operators: Vec<OperatorDef>,
    /// Graph input tensor indices.
    pub inputs: Vec<usize>,
    /// Graph output tensor indices.
    pub outputs: Vec<usize>,
}

impl ModelImage {
    /// Parses an image from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serializes the image back to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A tensor declared by the image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorDef {
    pub name: String,
    pub shape: Shape,
    pub dtype: DType,
    /// Required for `i8` tensors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<QuantParams>,
    /// Present for constants (weights, biases, fill values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TensorData>,
}

impl TensorDef {
    /// Returns `true` if the tensor carries constant data.
    pub fn is_constant(&self) -> bool {
        self.data.is_some()
    }

    /// Bytes needed to hold the tensor.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }
}

/// Constant tensor contents, tagged by element type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorData {
    I8(Vec<i8>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::I8(_) => DType::I8,
            TensorData::I32(_) => DType::I32,
            TensorData::F32(_) => DType::F32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            TensorData::I8(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes the values in the arena's little-endian byte layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            TensorData::I8(v) => v.iter().map(|&x| x as u8).collect(),
            TensorData::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TensorData::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_def_parse() {
        let json = r#"{
            "name": "w", "shape": [2, 1], "dtype": "i8",
            "quant": {"scale": 0.5, "zero_point": 0},
            "data": {"i8": [1, -1]}
        }"#;
        let t: TensorDef = serde_json::from_str(json).unwrap();
        assert!(t.is_constant());
        assert_eq!(t.size_bytes(), 2);
        assert_eq!(t.data.unwrap().to_le_bytes(), vec![1, 0xff]);
    }

    #[test]
    fn test_variable_tensor_has_no_data() {
        let t: TensorDef =
            serde_json::from_str(r#"{"name": "x", "shape": [1, 4], "dtype": "f32"}"#).unwrap();
        assert!(!t.is_constant());
        assert_eq!(t.size_bytes(), 16);
        assert!(t.quant.is_none());
    }

    #[test]
    fn test_i32_data_bytes() {
        let d = TensorData::I32(vec![1, -2]);
        assert_eq!(d.dtype(), DType::I32);
        assert_eq!(d.len(), 2);
        assert_eq!(d.to_le_bytes(), vec![1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);
    }
}
