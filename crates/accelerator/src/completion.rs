// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One-shot completion flag shared by the interrupt handler and the invoker.

use std::sync::{Condvar, Mutex, PoisonError};

/// Set by the interrupt handler, consumed by the blocked invoker.
#[derive(Debug, Default)]
pub struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the pending job as finished and wakes the waiter.
    pub fn signal(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = true;
        self.cond.notify_all();
    }

    /// Blocks until [`signal`](Self::signal) has been called, then re-arms.
    ///
    /// There is no timeout: a job that never raises its interrupt blocks
    /// the caller forever.
    pub fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = self.cond.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
        *done = false;
    }

    /// Returns `true` if a signal is pending.
    pub fn is_signalled(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_before_wait() {
        let c = Completion::new();
        c.signal();
        assert!(c.is_signalled());
        c.wait();
        assert!(!c.is_signalled());
    }

    #[test]
    fn test_wait_blocks_until_signal() {
        let c = Arc::new(Completion::new());
        let signaller = Arc::clone(&c);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.signal();
        });
        c.wait();
        handle.join().unwrap();
        assert!(!c.is_signalled());
    }
}
