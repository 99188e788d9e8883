// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena usage statistics.
//!
//! [`ArenaStats`] records how much of the configured arena a model actually
//! needs, which is what sizing the static buffer on the board depends on.

use crate::ArenaPlan;

/// Planning statistics for one arena.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ArenaStats {
    /// Configured capacity in bytes.
    pub capacity_bytes: usize,
    /// High-water mark of the last committed plan.
    pub peak_bytes: usize,
    /// Sum of all planned tensor sizes, before any sharing.
    pub requested_bytes: usize,
    /// Number of tensors in the last committed plan.
    pub planned_tensors: usize,
    /// Plans rejected for not fitting.
    pub rejected_plans: u64,
}

impl ArenaStats {
    /// Fraction of the arena the committed plan uses, in `[0.0, 1.0]`.
    pub fn utilization(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 0.0;
        }
        self.peak_bytes as f64 / self.capacity_bytes as f64
    }

    /// Bytes saved by letting tensors with disjoint lifetimes share memory.
    pub fn shared_bytes(&self) -> usize {
        self.requested_bytes.saturating_sub(self.peak_bytes)
    }

    pub(crate) fn record_plan(&mut self, plan: &ArenaPlan) {
        self.peak_bytes = plan.peak();
        self.requested_bytes = plan.slots().iter().map(|s| s.len).sum();
        self.planned_tensors = plan.slots().len();
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Arena: {} tensors, peak {} of {} bytes ({:.1}% used), {} bytes shared",
            self.planned_tensors,
            self.peak_bytes,
            self.capacity_bytes,
            self.utilization() * 100.0,
            self.shared_bytes(),
        )
    }
}
