// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the accelerator adapter.

/// Errors reported by the accelerator adapter.
#[derive(Debug, thiserror::Error)]
pub enum AcceleratorError {
    /// The driver rejected initialization.
    #[error("NPU driver initialization failed with status {status}")]
    DriverInit { status: i32 },

    /// A job was submitted before [`initialize`](crate::AcceleratorAdapter::initialize).
    #[error("NPU used before initialization")]
    NotInitialized,

    /// `initialize` was called on an adapter that is already running.
    #[error("NPU already initialized")]
    AlreadyInitialized,

    /// The driver refused or failed a job.
    #[error("NPU job failed with status {status}")]
    JobFailed { status: i32 },
}

/// Failure raised by the work inside an [`NpuJob`](crate::NpuJob).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct JobFault(pub String);
