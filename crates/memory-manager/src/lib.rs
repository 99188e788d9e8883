// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! A fixed-capacity tensor arena for microcontroller-class inference.
//!
//! # Key Components
//!
//! - [`ArenaCapacity`]: the arena size, with human-readable parsing
//!   (`"125K"`, `"1M"`).
//! - [`ArenaPlan`]: lifetime-aware greedy placement of tensors, aligned to
//!   [`ARENA_ALIGNMENT`] bytes.
//! - [`TensorArena`]: the single buffer, allocated once; rejects plans that
//!   do not fit and hands out disjoint input/output borrows per operator.
//! - [`ArenaStats`]: peak usage and sharing figures for sizing the buffer.
//!
//! # Ownership Model
//!
//! ```text
//! ArenaPlan::greedy(requests) ──► TensorArena::commit(&plan)
//!                                        │
//!                                        ▼
//!                       split_io(inputs, output) ──► (&[u8]..., &mut [u8])
//! ```
//!
//! The borrow checker guarantees no kernel can write a slot while another
//! borrow of the arena is alive; `split_io` performs the one split that
//! kernels need.

mod arena;
mod capacity;
mod error;
mod planner;
mod stats;

pub use arena::{ArenaSlot, TensorArena};
pub use capacity::ArenaCapacity;
pub use error::MemoryError;
pub use planner::{align_up, ArenaPlan, TensorRequest, ARENA_ALIGNMENT};
pub use stats::ArenaStats;
