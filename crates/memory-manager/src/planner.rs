// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lifetime-aware greedy placement of tensors in the arena.
//!
//! Requests are placed largest first. Each one goes to the lowest aligned
//! offset that does not collide with an already placed tensor whose lifetime
//! overlaps its own. Tensors that are never live at the same time may share
//! bytes, which keeps the peak well below the sum of all tensor sizes.

use crate::{ArenaSlot, MemoryError};

/// Alignment of every planned offset, in bytes.
pub const ARENA_ALIGNMENT: usize = 16;

/// One tensor to be placed, live over steps `first_use..=last_use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorRequest {
    pub size: usize,
    pub first_use: usize,
    pub last_use: usize,
}

impl TensorRequest {
    fn overlaps(&self, other: &TensorRequest) -> bool {
        self.first_use <= other.last_use && other.first_use <= self.last_use
    }
}

/// The result of planning: one offset per request plus the high-water mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaPlan {
    slots: Vec<ArenaSlot>,
    peak: usize,
}

impl ArenaPlan {
    /// Plans `requests`, returning offsets in request order.
    ///
    /// # Errors
    /// Returns [`MemoryError::InvalidLifetime`] if a request's last use
    /// precedes its first use.
    pub fn greedy(requests: &[TensorRequest]) -> Result<Self, MemoryError> {
        for (index, r) in requests.iter().enumerate() {
            if r.last_use < r.first_use {
                return Err(MemoryError::InvalidLifetime {
                    index,
                    first_use: r.first_use,
                    last_use: r.last_use,
                });
            }
        }

        let mut order: Vec<usize> = (0..requests.len()).collect();
        // Largest first; ties keep request order so plans are deterministic.
        order.sort_by(|&a, &b| requests[b].size.cmp(&requests[a].size).then(a.cmp(&b)));

        let mut offsets: Vec<Option<usize>> = vec![None; requests.len()];
        let mut peak = 0;
        for &i in &order {
            let req = &requests[i];
            let mut conflicts: Vec<(usize, usize)> = order
                .iter()
                .filter_map(|&j| offsets[j].map(|off| (j, off)))
                .filter(|&(j, _)| requests[j].overlaps(req))
                .map(|(j, off)| (off, off + requests[j].size))
                .collect();
            conflicts.sort_unstable();

            let mut candidate = 0;
            for (start, end) in conflicts {
                if candidate + req.size <= start {
                    break;
                }
                candidate = candidate.max(align_up(end));
            }
            offsets[i] = Some(candidate);
            peak = peak.max(candidate + req.size);
        }

        let slots = requests
            .iter()
            .zip(offsets)
            .map(|(r, off)| ArenaSlot::new(off.unwrap_or(0), r.size))
            .collect();
        Ok(Self { slots, peak })
    }

    /// Slot assigned to request `index`.
    pub fn slot(&self, index: usize) -> Option<ArenaSlot> {
        self.slots.get(index).copied()
    }

    pub fn slots(&self) -> &[ArenaSlot] {
        &self.slots
    }

    /// Bytes the arena must hold for this plan.
    pub fn peak(&self) -> usize {
        self.peak
    }
}

/// Rounds `n` up to [`ARENA_ALIGNMENT`].
pub fn align_up(n: usize) -> usize {
    n.div_ceil(ARENA_ALIGNMENT) * ARENA_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(size: usize, first_use: usize, last_use: usize) -> TensorRequest {
        TensorRequest {
            size,
            first_use,
            last_use,
        }
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 16);
        assert_eq!(align_up(16), 16);
        assert_eq!(align_up(40), 48);
    }

    #[test]
    fn test_disjoint_lifetimes_share_memory() {
        let plan = ArenaPlan::greedy(&[req(100, 0, 0), req(100, 1, 1)]).unwrap();
        assert_eq!(plan.slot(0).unwrap().offset, 0);
        assert_eq!(plan.slot(1).unwrap().offset, 0);
        assert_eq!(plan.peak(), 100);
    }

    #[test]
    fn test_overlapping_lifetimes_do_not_collide() {
        let requests = [req(40, 0, 1), req(72, 1, 2), req(64, 2, 3), req(16, 3, 4)];
        let plan = ArenaPlan::greedy(&requests).unwrap();
        for (i, a) in requests.iter().enumerate() {
            for (j, b) in requests.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    let sa = plan.slot(i).unwrap();
                    let sb = plan.slot(j).unwrap();
                    assert!(
                        sa.end() <= sb.offset || sb.end() <= sa.offset,
                        "requests {i} and {j} collide: {sa:?} vs {sb:?}"
                    );
                }
            }
        }
        assert!(plan.peak() < requests.iter().map(|r| align_up(r.size)).sum::<usize>());
    }

    #[test]
    fn test_offsets_aligned() {
        let plan = ArenaPlan::greedy(&[req(3, 0, 2), req(5, 0, 2), req(7, 0, 2)]).unwrap();
        for slot in plan.slots() {
            assert_eq!(slot.offset % ARENA_ALIGNMENT, 0);
        }
        assert_eq!(plan.peak(), 16 + 16 + 3);
    }

    #[test]
    fn test_fills_gaps() {
        // 0: big, live 0..=1. 1: small, live 2..=2 fits at 0 after 0 dies.
        let plan = ArenaPlan::greedy(&[req(64, 0, 1), req(32, 1, 2), req(16, 2, 2)]).unwrap();
        assert_eq!(plan.slot(2).unwrap().offset, 0);
    }

    #[test]
    fn test_inverted_lifetime_rejected() {
        assert!(matches!(
            ArenaPlan::greedy(&[req(8, 3, 1)]),
            Err(MemoryError::InvalidLifetime { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_plan() {
        let plan = ArenaPlan::greedy(&[]).unwrap();
        assert_eq!(plan.peak(), 0);
        assert!(plan.slots().is_empty());
    }
}
