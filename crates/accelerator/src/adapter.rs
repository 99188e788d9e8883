// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accelerator adapter.
//!
//! ```text
//! initialize(irq_ctrl)
//!   ├─ set_vector(irq, handler)   handler = completion.signal()
//!   ├─ enable_irq(irq)
//!   └─ driver.init(base, security, privilege)   != 0 → DriverInit
//!
//! invoke(job)
//!   ├─ driver.invoke(job)                        != 0 → JobFailed
//!   └─ completion.wait()                         blocks until the IRQ fires
//! ```

use crate::{AcceleratorError, Completion, InterruptController, IrqHandler, NpuConfig, NpuDriver, NpuJob};
use std::sync::Arc;

/// Owns the NPU driver and links its completion interrupt to blocking
/// job submission.
pub struct AcceleratorAdapter {
    driver: Box<dyn NpuDriver>,
    config: NpuConfig,
    completion: Arc<Completion>,
    initialized: bool,
    jobs_completed: u64,
}

impl AcceleratorAdapter {
    pub fn new(driver: Box<dyn NpuDriver>, config: NpuConfig) -> Self {
        Self {
            driver,
            config,
            completion: Arc::new(Completion::new()),
            initialized: false,
            jobs_completed: 0,
        }
    }

    /// Registers the completion interrupt and brings up the driver.
    ///
    /// # Errors
    /// [`AcceleratorError::DriverInit`] carries the driver's nonzero status.
    /// There is no retry; callers treat this as fatal.
    pub fn initialize(&mut self, interrupts: &dyn InterruptController) -> Result<(), AcceleratorError> {
        if self.initialized {
            return Err(AcceleratorError::AlreadyInitialized);
        }

        let completion = Arc::clone(&self.completion);
        let handler: IrqHandler = Arc::new(move || completion.signal());
        interrupts.set_vector(self.config.irq, handler);
        interrupts.enable_irq(self.config.irq);

        let status = self.driver.init(
            self.config.base_address,
            self.config.security_enable,
            self.config.privilege_enable,
        );
        if status != 0 {
            tracing::error!(status, "failed to initialise NPU device");
            return Err(AcceleratorError::DriverInit { status });
        }

        self.initialized = true;
        tracing::info!(
            base_address = format_args!("{:#x}", self.config.base_address),
            irq = self.config.irq,
            security = self.config.security_enable,
            privilege = self.config.privilege_enable,
            "NPU device initialised"
        );
        Ok(())
    }

    /// Submits `job` and blocks until its completion interrupt.
    ///
    /// # Errors
    /// [`AcceleratorError::NotInitialized`] before `initialize`;
    /// [`AcceleratorError::JobFailed`] if the driver returns a nonzero status,
    /// in which case no wait takes place.
    pub fn invoke(&mut self, job: &mut dyn NpuJob) -> Result<(), AcceleratorError> {
        if !self.initialized {
            return Err(AcceleratorError::NotInitialized);
        }
        let status = self.driver.invoke(job);
        if status != 0 {
            tracing::warn!(job = job.name(), status, "NPU job rejected");
            return Err(AcceleratorError::JobFailed { status });
        }
        self.completion.wait();
        self.jobs_completed += 1;
        tracing::trace!(job = job.name(), "NPU job complete");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &NpuConfig {
        &self.config
    }

    /// Jobs that ran to completion.
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed
    }
}

impl std::fmt::Debug for AcceleratorAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorAdapter")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("jobs_completed", &self.jobs_completed)
            .finish_non_exhaustive()
    }
}
