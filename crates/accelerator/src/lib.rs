// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accelerator
//!
//! Adapter between the model runtime and the NPU driver.
//!
//! - [`AcceleratorAdapter`]: registers the NPU completion interrupt,
//!   initializes the driver with the configured base address and
//!   security/privilege flags, and runs offloaded jobs to completion.
//! - [`NpuDriver`] / [`InterruptController`] / [`NpuJob`]: the boundary
//!   traits a board support package implements.
//! - [`sim`]: a host-side NPU and vector table with fault injection.
//!
//! # Example
//! ```
//! use accelerator::{sim, AcceleratorAdapter, NpuConfig};
//!
//! let (npu, nvic) = sim::simulated(0);
//! let mut adapter = AcceleratorAdapter::new(Box::new(npu), NpuConfig::default());
//! adapter.initialize(nvic.as_ref()).unwrap();
//! assert!(adapter.is_initialized());
//! ```

mod adapter;
mod completion;
mod config;
mod driver;
mod error;
pub mod sim;

pub use adapter::AcceleratorAdapter;
pub use completion::Completion;
pub use config::NpuConfig;
pub use driver::{InterruptController, IrqHandler, NpuDriver, NpuJob};
pub use error::{AcceleratorError, JobFault};
