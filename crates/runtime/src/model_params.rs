// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Build-time quantization constants of the supported model variants.
//!
//! The firmware quantizes inputs and dequantizes the output with these
//! constants rather than the ones stored in the image. The active variant is
//! chosen with the `variant-fold-1` cargo feature; v2.0.0 is the default.

use tensor_core::QuantParams;

/// Input and output quantization of one model variant.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelParams {
    pub input: QuantParams,
    pub output: QuantParams,
}

impl ModelParams {
    /// Checks both parameter pairs.
    pub fn validate(&self) -> Result<(), tensor_core::TensorError> {
        self.input.validate()?;
        self.output.validate()
    }
}

/// AF detector v2.0.0.
pub const V2_0_0: ModelParams = ModelParams {
    input: QuantParams {
        scale: 1.747_661_5,
        zero_point: -17,
    },
    output: QuantParams {
        scale: 0.003_906_25,
        zero_point: -128,
    },
};

/// AF detector, cross-validation fold 1.
pub const FOLD_1: ModelParams = ModelParams {
    input: QuantParams {
        scale: 6.818_519_6,
        zero_point: -82,
    },
    output: QuantParams {
        scale: 0.003_906_25,
        zero_point: -128,
    },
};

/// Variant compiled into this build.
#[cfg(not(feature = "variant-fold-1"))]
pub const ACTIVE: ModelParams = V2_0_0;
#[cfg(feature = "variant-fold-1")]
pub const ACTIVE: ModelParams = FOLD_1;

/// Name of the variant compiled into this build.
#[cfg(not(feature = "variant-fold-1"))]
pub const ACTIVE_VARIANT: &str = "v2.0.0";
#[cfg(feature = "variant-fold-1")]
pub const ACTIVE_VARIANT: &str = "fold_1";

/// Model image compiled into the binary.
pub static EMBEDDED_MODEL: &[u8] = include_bytes!("../models/af_detect_v2_0_0.json");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_are_valid() {
        assert!(V2_0_0.validate().is_ok());
        assert!(FOLD_1.validate().is_ok());
        assert!(ACTIVE.validate().is_ok());
    }

    #[test]
    fn test_output_maps_to_unit_interval() {
        let out = V2_0_0.output;
        assert_eq!(out.dequantize(i8::MIN), 0.0);
        assert!(out.dequantize(i8::MAX) < 1.0);
    }

    #[test]
    fn test_embedded_model_parses() {
        let image = model_ir::ModelImage::from_slice(EMBEDDED_MODEL).unwrap();
        assert_eq!(image.version, model_ir::SUPPORTED_SCHEMA_VERSION);
    }
}
