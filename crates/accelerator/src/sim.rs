// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host-side stand-ins for the NPU and its interrupt controller.
//!
//! [`SimulatedNpu`] runs each job synchronously on the calling thread and
//! then raises its completion interrupt through a shared
//! [`SimInterruptController`], exactly as the hardware would signal the
//! registered handler. Faults can be injected for testing.

use crate::{InterruptController, IrqHandler, NpuDriver, NpuJob};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Status returned for an injected or device-level failure.
pub const STATUS_DEVICE_ERROR: i32 = -1;
/// Status returned when a job's own work fails.
pub const STATUS_JOB_FAULT: i32 = -2;
/// Status returned when no enabled handler is registered on the NPU's line.
pub const STATUS_NO_IRQ: i32 = -3;

/// A software vector table.
#[derive(Default)]
pub struct SimInterruptController {
    handlers: Mutex<HashMap<u32, IrqHandler>>,
    enabled: Mutex<HashSet<u32>>,
}

impl SimInterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `irq`. Returns `false` if the line is masked or has no handler.
    pub fn raise(&self, irq: u32) -> bool {
        if !self.is_enabled(irq) {
            return false;
        }
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&irq)
            .cloned();
        match handler {
            Some(h) => {
                h();
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, irq: u32) -> bool {
        self.enabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&irq)
    }

    pub fn has_handler(&self, irq: u32) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&irq)
    }
}

impl InterruptController for SimInterruptController {
    fn set_vector(&self, irq: u32, handler: IrqHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(irq, handler);
    }

    fn enable_irq(&self, irq: u32) {
        self.enabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(irq);
    }
}

impl std::fmt::Debug for SimInterruptController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimInterruptController").finish_non_exhaustive()
    }
}

/// A simulated NPU that executes jobs on the host CPU.
#[derive(Debug)]
pub struct SimulatedNpu {
    nvic: Arc<SimInterruptController>,
    irq: u32,
    init_status: i32,
    failing: HashSet<u64>,
    initialized: bool,
    invocations: u64,
}

impl SimulatedNpu {
    /// Creates an NPU that signals completion on `irq` through `nvic`.
    pub fn new(nvic: Arc<SimInterruptController>, irq: u32) -> Self {
        Self {
            nvic,
            irq,
            init_status: 0,
            failing: HashSet::new(),
            initialized: false,
            invocations: 0,
        }
    }

    /// Makes `init` return `status`.
    pub fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    /// Makes the `n`-th invocation (1-based) fail without running its job.
    pub fn fail_invocation(mut self, n: u64) -> Self {
        self.failing.insert(n);
        self
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl NpuDriver for SimulatedNpu {
    fn init(&mut self, base_address: u64, security_enable: bool, privilege_enable: bool) -> i32 {
        tracing::debug!(
            base_address = format_args!("{base_address:#x}"),
            security_enable,
            privilege_enable,
            status = self.init_status,
            "simulated NPU init"
        );
        self.initialized = self.init_status == 0;
        self.init_status
    }

    fn invoke(&mut self, job: &mut dyn NpuJob) -> i32 {
        self.invocations += 1;
        if !self.initialized || self.failing.contains(&self.invocations) {
            return STATUS_DEVICE_ERROR;
        }
        if let Err(fault) = job.run() {
            tracing::warn!(job = job.name(), %fault, "simulated NPU job fault");
            return STATUS_JOB_FAULT;
        }
        if !self.nvic.raise(self.irq) {
            return STATUS_NO_IRQ;
        }
        0
    }
}

/// Builds a simulated NPU and the controller it signals through.
pub fn simulated(irq: u32) -> (SimulatedNpu, Arc<SimInterruptController>) {
    let nvic = Arc::new(SimInterruptController::new());
    (SimulatedNpu::new(Arc::clone(&nvic), irq), nvic)
}
