// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena capacity configuration and parsing.
//!
//! The arena size is a deployment decision, not something the runtime
//! derives: the firmware reserves a fixed static buffer and the host build
//! mirrors that with an explicit [`ArenaCapacity`].

use crate::MemoryError;
use std::fmt;

/// Recognised suffixes, longest first so `"KB"` wins over `"B"`.
const SUFFIXES: [(&str, usize); 5] = [
    ("MB", 1024 * 1024),
    ("M", 1024 * 1024),
    ("KB", 1024),
    ("K", 1024),
    ("B", 1),
];

/// Size of the tensor arena in bytes.
///
/// # Parsing
/// Accepts binary-suffixed strings:
/// - `"125K"` or `"125KB"` → 125 × 1024 bytes
/// - `"1M"` or `"1MB"` → 1024² bytes
/// - `"4096"` or `"4096B"` → raw byte count
///
/// # Examples
/// ```
/// use memory_manager::ArenaCapacity;
///
/// let c = ArenaCapacity::parse("125K").unwrap();
/// assert_eq!(c.as_bytes(), 125 * 1024);
/// assert_eq!(c.to_string(), "125 KB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArenaCapacity {
    bytes: usize,
}

impl ArenaCapacity {
    /// Creates a capacity from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a capacity from kibibytes.
    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Returns the capacity in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable capacity string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let invalid = |reason: &str| MemoryError::InvalidCapacity {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let upper = trimmed.to_uppercase();
        let (digits, multiplier) = SUFFIXES
            .iter()
            .find(|(suffix, _)| upper.ends_with(suffix))
            .map(|(suffix, m)| (&trimmed[..trimmed.len() - suffix.len()], *m))
            .unwrap_or((trimmed, 1));

        let value: usize = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional K or M suffix"))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value overflows usize"))?;
        if bytes == 0 {
            return Err(invalid("capacity must be non-zero"));
        }
        Ok(Self { bytes })
    }
}

impl Default for ArenaCapacity {
    /// 125 KB, the static arena reserved on the target board.
    fn default() -> Self {
        Self::from_kb(125)
    }
}

impl fmt::Display for ArenaCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 && self.bytes % (1024 * 1024) == 0 {
            write!(f, "{} MB", self.bytes / (1024 * 1024))
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_125k() {
        assert_eq!(ArenaCapacity::default().as_bytes(), 128_000);
    }

    #[test]
    fn test_parse_kilobytes() {
        assert_eq!(ArenaCapacity::parse("125K").unwrap().as_bytes(), 128_000);
        assert_eq!(ArenaCapacity::parse("125kb").unwrap().as_bytes(), 128_000);
        assert_eq!(ArenaCapacity::parse(" 64 K ").unwrap().as_bytes(), 65_536);
    }

    #[test]
    fn test_parse_megabytes_and_bytes() {
        assert_eq!(ArenaCapacity::parse("1M").unwrap().as_bytes(), 1 << 20);
        assert_eq!(ArenaCapacity::parse("4096").unwrap().as_bytes(), 4096);
        assert_eq!(ArenaCapacity::parse("512B").unwrap().as_bytes(), 512);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ArenaCapacity::parse("").is_err());
        assert!(ArenaCapacity::parse("abc").is_err());
        assert!(ArenaCapacity::parse("0K").is_err());
        assert!(ArenaCapacity::parse("12G").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ArenaCapacity::from_kb(125).to_string(), "125 KB");
        assert_eq!(ArenaCapacity::from_bytes(1 << 20).to_string(), "1 MB");
        assert_eq!(ArenaCapacity::from_bytes(100).to_string(), "100 B");
    }

    #[test]
    fn test_serde_roundtrip() {
        let c = ArenaCapacity::from_kb(8);
        let json = serde_json::to_string(&c).unwrap();
        let back: ArenaCapacity = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
