// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for arena planning and access.

/// Errors that can occur while sizing, planning or accessing the arena.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The plan needs more bytes than the arena holds.
    #[error("tensor arena exhausted: plan requires {required} bytes, arena holds {capacity}")]
    ArenaExhausted { required: usize, capacity: usize },

    /// A capacity string could not be parsed.
    #[error("invalid arena capacity '{input}': {reason}")]
    InvalidCapacity { input: String, reason: String },

    /// A slot lies (partly) outside the arena.
    #[error("slot at offset {offset} (+{len} bytes) is outside the {capacity}-byte arena")]
    SlotOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// An input slot overlaps the output slot it is read alongside.
    #[error("input slot at offset {input_offset} overlaps output slot at offset {output_offset}")]
    OverlappingSlots {
        input_offset: usize,
        output_offset: usize,
    },

    /// A tensor request has an inverted lifetime.
    #[error("request {index}: last use {last_use} precedes first use {first_use}")]
    InvalidLifetime {
        index: usize,
        first_use: usize,
        last_use: usize,
    },
}
