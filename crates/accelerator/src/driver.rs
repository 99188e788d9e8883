// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Boundary traits for the NPU driver and the interrupt controller.
//!
//! These mirror the vendor C interfaces: the driver reports C-style status
//! codes (0 on success) and the interrupt controller accepts one handler per
//! line. A firmware build implements them over the real registers; the
//! [`sim`](crate::sim) module implements them on the host.

use crate::JobFault;
use std::sync::Arc;

/// Interrupt service routine registered on an IRQ line.
pub type IrqHandler = Arc<dyn Fn() + Send + Sync>;

/// Vector table and enable control for interrupt lines.
pub trait InterruptController {
    /// Installs `handler` as the service routine for `irq`.
    fn set_vector(&self, irq: u32, handler: IrqHandler);

    /// Unmasks `irq`.
    fn enable_irq(&self, irq: u32);
}

/// Work executed by the NPU as one command stream.
pub trait NpuJob {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Performs the job.
    fn run(&mut self) -> Result<(), JobFault>;
}

/// The NPU driver.
pub trait NpuDriver {
    /// Brings up the device at `base_address`. Returns 0 on success.
    fn init(&mut self, base_address: u64, security_enable: bool, privilege_enable: bool) -> i32;

    /// Submits `job`. Returns 0 once the job is accepted; completion is
    /// signalled separately through the registered interrupt.
    fn invoke(&mut self, job: &mut dyn NpuJob) -> i32;
}
