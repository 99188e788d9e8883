// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The model image format and its validated in-memory graph.
//!
//! - [`ModelImage`]: the serialized model: tensors (with optional constant
//!   data and quantization), operators and graph inputs/outputs.
//! - [`Operator`] / [`OpCode`]: the fixed operator set, including the
//!   `npu_offload` node that nests a sub-graph for the accelerator.
//! - [`ModelGraph`]: the image wrapped in a **type-state** (`Loaded` →
//!   `Validated`), so the runtime only ever executes checked graphs.
//! - [`ModelLoader`]: reads images from an embedded byte array or a
//!   memory-mapped flash image.
//!
//! # Example
//! ```no_run
//! use model_ir::{ModelLoader, ModelSource};
//!
//! let graph = ModelLoader::load(&ModelSource::Flash("./af_detect.json".into())).unwrap();
//! println!("{}", graph.summary());
//! print!("{graph}");
//! ```

mod error;
pub mod graph;
mod image;
mod loader;
mod operator;

pub use error::ModelError;
pub use graph::{ModelGraph, TensorLifetime};
pub use image::{ModelImage, TensorData, TensorDef};
pub use loader::{ModelLoader, ModelSource, SUPPORTED_SCHEMA_VERSION};
pub use operator::{OpCode, Operator, OperatorDef};
