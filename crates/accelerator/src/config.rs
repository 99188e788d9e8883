// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator configuration.
//!
//! # TOML Format
//! ```toml
//! [npu]
//! base_address = 0x40000000
//! irq = 0
//! security_enable = true
//! privilege_enable = true
//! ```

/// Static NPU parameters, consumed once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NpuConfig {
    /// Base address of the NPU register block.
    #[serde(default)]
    pub base_address: u64,
    /// Interrupt line the NPU signals completion on.
    #[serde(default)]
    pub irq: u32,
    /// Run the NPU in the secure world.
    #[serde(default = "default_true")]
    pub security_enable: bool,
    /// Run the NPU with privileged access.
    #[serde(default = "default_true")]
    pub privilege_enable: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NpuConfig {
    fn default() -> Self {
        Self {
            base_address: 0,
            irq: 0,
            security_enable: true,
            privilege_enable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let c: NpuConfig = toml::from_str("irq = 55").unwrap();
        assert_eq!(c.irq, 55);
        assert_eq!(c.base_address, 0);
        assert!(c.security_enable);
        assert!(c.privilege_enable);
    }

    #[test]
    fn test_hex_base_address() {
        let c: NpuConfig =
            toml::from_str("base_address = 0x4000_0000\nprivilege_enable = false").unwrap();
        assert_eq!(c.base_address, 0x4000_0000);
        assert!(!c.privilege_enable);
    }
}
