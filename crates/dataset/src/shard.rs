// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Two-level hex sharding of dataset indices.
//!
//! Index `i` lives in directory `<root>/<s1>/<s2>/`, where `s1` is bits
//! `[16:23]` and `s2` bits `[8:15]` of `i`, each rendered as two lowercase
//! hex digits. One leaf directory therefore holds at most 256 indices, which
//! keeps FAT directory scans short. Bits above 23 are not encoded, so the
//! dataset size is capped at [`MAX_INDEX_SPACE`].

use std::fmt;

/// Number of indices the shard prefix can address (2^24).
pub const MAX_INDEX_SPACE: u32 = 1 << 24;

/// Number of consecutive indices sharing one leaf directory.
pub const SHARD_BLOCK: u32 = 1 << 8;

/// The `<s1>/<s2>` directory pair of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardPrefix {
    /// Bits `[16:23]`.
    pub outer: u8,
    /// Bits `[8:15]`.
    pub inner: u8,
}

impl ShardPrefix {
    /// Computes the shard of `index`.
    ///
    /// # Examples
    /// ```
    /// use dataset::ShardPrefix;
    /// let s = ShardPrefix::of(0x01_23_45);
    /// assert_eq!(s.to_string(), "01/23");
    /// ```
    pub fn of(index: u32) -> Self {
        Self {
            outer: (index >> 16) as u8,
            inner: (index >> 8) as u8,
        }
    }

    /// Returns the first index stored under this shard.
    pub fn block_start(self) -> u32 {
        (u32::from(self.outer) << 16) | (u32::from(self.inner) << 8)
    }

    /// Returns `<s1>`, the first path segment.
    pub fn outer_segment(self) -> String {
        format!("{:02x}", self.outer)
    }
}

impl fmt::Display for ShardPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}/{:02x}", self.outer, self.inner)
    }
}

fn join(root: &str, rest: fmt::Arguments<'_>) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        format!("{rest}")
    } else {
        format!("{root}/{rest}")
    }
}

/// `<root>/<s1>`, the outer shard directory of `index`.
pub fn outer_dir(root: &str, index: u32) -> String {
    join(root, format_args!("{}", ShardPrefix::of(index).outer_segment()))
}

/// `<root>/<s1>/<s2>`, the leaf directory of `index`.
pub fn shard_dir(root: &str, index: u32) -> String {
    join(root, format_args!("{}", ShardPrefix::of(index)))
}

/// `<root>/<s1>/<s2>/x_test_<index:06>.bin`.
pub fn sample_path(root: &str, index: u32) -> String {
    join(root, format_args!("{}/x_test_{index:06}.bin", ShardPrefix::of(index)))
}

/// `<root>/<s1>/<s2>/y_test_<index:06>.bin`.
pub fn label_path(root: &str, index: u32) -> String {
    join(root, format_args!("{}/y_test_{index:06}.bin", ShardPrefix::of(index)))
}

/// `<root>/<s1>/<s2>/<prefix>.bin`, the batch file covering `index`.
pub fn batch_path(root: &str, index: u32, prefix: &str) -> String {
    join(root, format_args!("{}/{prefix}.bin", ShardPrefix::of(index)))
}

/// `<root>/<s1>/<s2>/<prefix><index:06>.bin`, a per-sample result file.
pub fn result_path(root: &str, index: u32, prefix: &str) -> String {
    join(root, format_args!("{}/{prefix}{index:06}.bin", ShardPrefix::of(index)))
}
