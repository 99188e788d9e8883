// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the model runtime and the test loop.

use model_ir::OpCode;

/// Fatal errors raised while bringing the runtime up.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The NPU could not be initialized.
    #[error("accelerator initialization failed: {0}")]
    Accelerator(#[from] accelerator::AcceleratorError),

    /// The model image could not be read, parsed or validated.
    #[error("model error: {0}")]
    Model(#[source] model_ir::ModelError),

    /// The image was written against a different schema.
    #[error("model schema version {found} is not supported (expected {supported})")]
    SchemaMismatch { found: u32, supported: u32 },

    /// The graph uses an operator the resolver passed to
    /// [`initialize_with_resolver`](crate::ModelRuntime::initialize_with_resolver)
    /// does not hold.
    #[error("operator '{op}' is not registered with the resolver")]
    UnsupportedOperator { op: OpCode },

    /// More operators were registered than the resolver holds.
    #[error("operator resolver is full ({capacity} entries)")]
    ResolverFull { capacity: usize },

    /// The tensor plan does not fit in the configured arena.
    #[error("tensor arena too small: plan requires {required} bytes, arena holds {capacity}")]
    ArenaExhausted { required: usize, capacity: usize },

    /// Any other arena failure.
    #[error("memory error: {0}")]
    Memory(#[source] memory_manager::MemoryError),

    /// Invalid runtime configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<model_ir::ModelError> for InitError {
    fn from(err: model_ir::ModelError) -> Self {
        match err {
            model_ir::ModelError::SchemaMismatch { found, supported } => {
                InitError::SchemaMismatch { found, supported }
            }
            other => InitError::Model(other),
        }
    }
}

impl From<memory_manager::MemoryError> for InitError {
    fn from(err: memory_manager::MemoryError) -> Self {
        match err {
            memory_manager::MemoryError::ArenaExhausted { required, capacity } => {
                InitError::ArenaExhausted { required, capacity }
            }
            other => InitError::Memory(other),
        }
    }
}

/// Failure of one graph step during inference.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// A kernel rejected its operands.
    #[error("{op} failed: {source}")]
    Kernel {
        op: OpCode,
        #[source]
        source: tensor_core::TensorError,
    },

    /// Arena access failed.
    #[error("arena access failed: {0}")]
    Memory(#[from] memory_manager::MemoryError),

    /// An `i8` tensor reached a kernel without quantization parameters.
    #[error("tensor {tensor} has no quantization parameters")]
    MissingQuant { tensor: usize },

    /// A variable tensor has no arena slot.
    #[error("tensor {tensor} was not planned into the arena")]
    Unplanned { tensor: usize },

    /// The NPU rejected or failed the offloaded sub-graph.
    #[error("NPU offload failed: {0}")]
    Accelerator(#[from] accelerator::AcceleratorError),

    /// An offload node appeared where a kernel was expected.
    #[error("offload sub-graphs cannot nest")]
    NestedOffload,
}

/// Errors returned by [`ModelRuntime::run_inference`](crate::ModelRuntime::run_inference).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The interpreter failed; the sample should be skipped.
    #[error("inference failed: {0}")]
    InferenceFailed(#[from] ExecError),

    /// The sample does not cover the model's input width.
    #[error("sample has {actual} features, model input needs {expected}")]
    InputMismatch { expected: usize, actual: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors that end a test loop run.
#[derive(Debug, thiserror::Error)]
pub enum TestbenchError {
    /// The loader hit an error it does not skip (strict scanning, mount failure).
    #[error("dataset error: {0}")]
    Load(#[from] dataset::LoadError),

    /// Invalid test loop configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
