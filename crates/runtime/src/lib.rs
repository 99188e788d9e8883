// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Runs the AF classifier on the NPU and drives the test loop over a
//! sharded dataset.
//!
//! The runtime takes:
//! - A model image from `model-ir` (embedded or read from flash).
//! - A tensor arena from `memory-manager`.
//! - An initialized NPU from `accelerator`.
//!
//! and executes the graph one sample at a time: host kernels from
//! `tensor-core` for the reshape/softmax/slice tail, the offloaded sub-graph
//! as a single NPU job.
//!
//! # Type-State Lifecycle
//! ```text
//! ModelRuntime<Uninitialized> → ModelRuntime<Ready>
//! ```
//! Inference is only defined on `Ready`, so it cannot run before the
//! accelerator, resolver and arena are set up.
//!
//! # Test Loop
//! [`Testbench`] ties a ready runtime to a `dataset` loader and result
//! writer and reports a [`RunMetrics`] summary at the end.

mod config;
mod error;
mod interpreter;
mod metrics;
pub mod model_params;
mod model_runtime;
mod resolver;
mod testbench;

pub use config::{RuntimeConfig, TestbenchConfig, WriteMode};
pub use error::{ExecError, InitError, RuntimeError, TestbenchError};
pub use metrics::RunMetrics;
pub use model_params::ModelParams;
pub use model_runtime::{
    Detection, InferenceOutput, ModelRuntime, Ready, RuntimeState, Uninitialized,
    DETECTION_THRESHOLD,
};
pub use resolver::{OpResolver, RESOLVER_CAPACITY};
pub use testbench::Testbench;
