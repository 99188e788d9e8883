// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fixed-size tensor arena.
//!
//! The arena is allocated once, at its configured capacity, and never grows.
//! A committed [`ArenaPlan`] decides where each variable tensor lives;
//! operators then borrow their input and output slots for the duration of
//! one kernel call.

use crate::{ArenaCapacity, ArenaPlan, ArenaStats, MemoryError};

/// A byte range inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaSlot {
    pub offset: usize,
    pub len: usize,
}

impl ArenaSlot {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    fn overlaps(&self, other: &ArenaSlot) -> bool {
        self.len > 0 && other.len > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

/// Fixed-capacity working memory for all intermediate tensors of one model.
///
/// # Example
/// ```
/// use memory_manager::{ArenaCapacity, ArenaPlan, TensorArena, TensorRequest};
///
/// let mut arena = TensorArena::new(ArenaCapacity::from_kb(1));
/// let plan = ArenaPlan::greedy(&[TensorRequest { size: 40, first_use: 0, last_use: 1 }]).unwrap();
/// arena.commit(&plan).unwrap();
/// arena.slot_mut(plan.slot(0).unwrap()).unwrap()[0] = 7;
/// ```
#[derive(Debug)]
pub struct TensorArena {
    buf: Box<[u8]>,
    stats: ArenaStats,
}

impl TensorArena {
    /// Allocates the arena at its full capacity, zero-filled.
    pub fn new(capacity: ArenaCapacity) -> Self {
        let bytes = capacity.as_bytes();
        Self {
            buf: vec![0u8; bytes].into_boxed_slice(),
            stats: ArenaStats {
                capacity_bytes: bytes,
                ..Default::default()
            },
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Accepts a plan if it fits.
    ///
    /// # Errors
    /// Returns [`MemoryError::ArenaExhausted`] when the plan's peak exceeds
    /// the capacity.
    pub fn commit(&mut self, plan: &ArenaPlan) -> Result<(), MemoryError> {
        if plan.peak() > self.capacity() {
            self.stats.rejected_plans += 1;
            return Err(MemoryError::ArenaExhausted {
                required: plan.peak(),
                capacity: self.capacity(),
            });
        }
        self.stats.record_plan(plan);
        tracing::debug!(
            peak = plan.peak(),
            capacity = self.capacity(),
            tensors = plan.slots().len(),
            "arena plan committed"
        );
        Ok(())
    }

    /// Borrows a slot for reading.
    pub fn slot(&self, slot: ArenaSlot) -> Result<&[u8], MemoryError> {
        self.check(slot)?;
        Ok(&self.buf[slot.offset..slot.end()])
    }

    /// Borrows a slot for writing.
    pub fn slot_mut(&mut self, slot: ArenaSlot) -> Result<&mut [u8], MemoryError> {
        self.check(slot)?;
        Ok(&mut self.buf[slot.offset..slot.end()])
    }

    /// Borrows several input slots for reading and one output slot for
    /// writing at the same time.
    ///
    /// Inputs may overlap each other but never the output.
    ///
    /// # Errors
    /// Returns [`MemoryError::OverlappingSlots`] if an input shares bytes with
    /// the output and [`MemoryError::SlotOutOfBounds`] for slots outside the arena.
    pub fn split_io(
        &mut self,
        inputs: &[ArenaSlot],
        output: ArenaSlot,
    ) -> Result<(Vec<&[u8]>, &mut [u8]), MemoryError> {
        self.check(output)?;
        for input in inputs {
            self.check(*input)?;
            if input.overlaps(&output) {
                return Err(MemoryError::OverlappingSlots {
                    input_offset: input.offset,
                    output_offset: output.offset,
                });
            }
        }

        let (lo, rest) = self.buf.split_at_mut(output.offset);
        let (out, hi) = rest.split_at_mut(output.len);
        let lo: &[u8] = lo;
        let hi: &[u8] = hi;
        let views = inputs
            .iter()
            .map(|s| {
                if s.end() <= output.offset {
                    &lo[s.offset..s.end()]
                } else {
                    let base = output.end();
                    &hi[s.offset - base..s.end() - base]
                }
            })
            .collect();
        Ok((views, out))
    }

    /// Zeroes the whole arena.
    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    fn check(&self, slot: ArenaSlot) -> Result<(), MemoryError> {
        if slot.end() > self.buf.len() {
            return Err(MemoryError::SlotOutOfBounds {
                offset: slot.offset,
                len: slot.len,
                capacity: self.buf.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorRequest;

    #[test]
    fn test_commit_within_capacity() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(256));
        let plan = ArenaPlan::greedy(&[TensorRequest {
            size: 200,
            first_use: 0,
            last_use: 0,
        }])
        .unwrap();
        arena.commit(&plan).unwrap();
        assert_eq!(arena.stats().peak_bytes, 200);
    }

    #[test]
    fn test_commit_exhausted() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(64));
        let plan = ArenaPlan::greedy(&[TensorRequest {
            size: 65,
            first_use: 0,
            last_use: 0,
        }])
        .unwrap();
        let err = arena.commit(&plan).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::ArenaExhausted {
                required: 65,
                capacity: 64
            }
        ));
        assert_eq!(arena.stats().rejected_plans, 1);
    }

    #[test]
    fn test_slot_bounds() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(32));
        assert!(arena.slot(ArenaSlot::new(16, 16)).is_ok());
        assert!(arena.slot(ArenaSlot::new(16, 17)).is_err());
        assert!(arena.slot_mut(ArenaSlot::new(40, 0)).is_err());
    }

    #[test]
    fn test_split_io_reads_both_sides() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(64));
        arena.slot_mut(ArenaSlot::new(0, 4)).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        arena.slot_mut(ArenaSlot::new(48, 2)).unwrap().copy_from_slice(&[9, 8]);

        let (ins, out) = arena
            .split_io(&[ArenaSlot::new(0, 4), ArenaSlot::new(48, 2)], ArenaSlot::new(16, 16))
            .unwrap();
        assert_eq!(ins[0], &[1, 2, 3, 4]);
        assert_eq!(ins[1], &[9, 8]);
        out[0] = ins[0][3] + ins[1][0];

        assert_eq!(arena.slot(ArenaSlot::new(16, 1)).unwrap(), &[13]);
    }

    #[test]
    fn test_split_io_rejects_overlap() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(64));
        let err = arena
            .split_io(&[ArenaSlot::new(8, 16)], ArenaSlot::new(16, 16))
            .unwrap_err();
        assert!(matches!(err, MemoryError::OverlappingSlots { .. }));
    }

    #[test]
    fn test_clear() {
        let mut arena = TensorArena::new(ArenaCapacity::from_bytes(8));
        arena.slot_mut(ArenaSlot::new(0, 8)).unwrap().fill(0xaa);
        arena.clear();
        assert!(arena.slot(ArenaSlot::new(0, 8)).unwrap().iter().all(|&b| b == 0));
    }
}
