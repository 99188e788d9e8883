// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine int8 quantization.
//!
//! ```text
//! q    = round(real / scale) + zero_point      (round half away from zero)
//! real = (q - zero_point) * scale
//! ```
//!
//! Quantization saturates to `[-128, 127]`. Out-of-range values are clamped
//! rather than wrapped, and each call reports whether clamping happened so
//! callers can surface inputs that do not fit the model's input range.

use crate::TensorError;

/// Per-tensor affine quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuantParams {
    /// Real-valued step between adjacent quantized levels. Always `> 0`.
    pub scale: f32,
    /// Quantized value that represents real zero.
    pub zero_point: i32,
}

/// Result of quantizing a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantized {
    /// The stored int8 value.
    pub value: i8,
    /// `true` if the exact result fell outside `[-128, 127]` and was clamped.
    pub saturated: bool,
}

impl QuantParams {
    /// Creates validated quantization parameters.
    ///
    /// # Errors
    /// Returns [`TensorError::InvalidScale`] unless `scale` is finite and positive.
    pub fn new(scale: f32, zero_point: i32) -> Result<Self, TensorError> {
        let params = Self { scale, zero_point };
        params.validate()?;
        Ok(params)
    }

    /// Checks the `scale > 0` invariant (deserialized parameters bypass [`new`](Self::new)).
    pub fn validate(&self) -> Result<(), TensorError> {
        if self.scale.is_finite() && self.scale > 0.0 {
            Ok(())
        } else {
            Err(TensorError::InvalidScale { scale: self.scale })
        }
    }

    /// Quantizes one real value.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::QuantParams;
    /// let q = QuantParams::new(0.5, -10).unwrap();
    /// assert_eq!(q.quantize(1.25).value, -7); // round(2.5) = 3
    /// assert!(q.quantize(1000.0).saturated);
    /// ```
    pub fn quantize(&self, real: f32) -> Quantized {
        // `as i64` saturates and maps NaN to 0, so the zero point wins for NaN.
        let q = (real / self.scale).round() as i64 + i64::from(self.zero_point);
        let clamped = q.clamp(i64::from(i8::MIN), i64::from(i8::MAX));
        Quantized {
            value: clamped as i8,
            saturated: clamped != q,
        }
    }

    /// Quantizes `src` into `dst` element-wise and returns the number of
    /// saturated elements.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferSizeMismatch`] if the lengths differ.
    pub fn quantize_slice(&self, src: &[f32], dst: &mut [i8]) -> Result<usize, TensorError> {
        if src.len() != dst.len() {
            return Err(TensorError::BufferSizeMismatch {
                expected: dst.len(),
                actual: src.len(),
            });
        }
        let mut saturated = 0;
        for (d, &s) in dst.iter_mut().zip(src) {
            let q = self.quantize(s);
            saturated += usize::from(q.saturated);
            *d = q.value;
        }
        Ok(saturated)
    }

    /// Maps a quantized value back to the real domain.
    pub fn dequantize(&self, q: i8) -> f32 {
        (i32::from(q) - self.zero_point) as f32 * self.scale
    }

    /// Returns the quantized interval covering the real interval `[lo, hi]`,
    /// intersected with the int8 range.
    pub fn quantized_range(&self, lo: f32, hi: f32) -> (i8, i8) {
        (self.quantize(lo).value, self.quantize(hi).value)
    }
}

impl std::fmt::Display for QuantParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scale={} zp={}", self.scale, self.zero_point)
    }
}

/// Rescales an int32 accumulator into an int8 output.
///
/// `multiplier` is `input_scale * weight_scale / output_scale`; the result is
/// offset by `zero_point` and clamped to the activation range `range`.
pub fn requantize(acc: i32, multiplier: f64, zero_point: i32, range: (i8, i8)) -> i8 {
    let scaled = (f64::from(acc) * multiplier).round() as i64 + i64::from(zero_point);
    scaled.clamp(i64::from(range.0), i64::from(range.1)) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_scale() {
        assert!(QuantParams::new(0.0, 0).is_err());
        assert!(QuantParams::new(-1.0, 0).is_err());
        assert!(QuantParams::new(f32::NAN, 0).is_err());
        assert!(QuantParams::new(f32::INFINITY, 0).is_err());
        assert!(QuantParams::new(0.1, 3).is_ok());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let q = QuantParams::new(1.0, 0).unwrap();
        assert_eq!(q.quantize(2.5).value, 3);
        assert_eq!(q.quantize(-2.5).value, -3);
        assert_eq!(q.quantize(2.4).value, 2);
        assert_eq!(q.quantize(-0.5).value, -1);
    }

    #[test]
    fn test_zero_point_offset() {
        let q = QuantParams::new(1.7476615, -17).unwrap();
        assert_eq!(q.quantize(0.0).value, -17);
        // 10 / 1.7476615 = 5.72 → 6, 6 - 17 = -11.
        assert_eq!(q.quantize(10.0).value, -11);
    }

    #[test]
    fn test_saturates_instead_of_wrapping() {
        let q = QuantParams::new(1.0, 0).unwrap();
        let hi = q.quantize(300.0);
        assert_eq!(hi.value, 127);
        assert!(hi.saturated);
        let lo = q.quantize(-300.0);
        assert_eq!(lo.value, -128);
        assert!(lo.saturated);
        assert!(!q.quantize(127.0).saturated);
    }

    #[test]
    fn test_nan_maps_to_zero_point() {
        let q = QuantParams::new(0.25, 5).unwrap();
        assert_eq!(q.quantize(f32::NAN).value, 5);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let q = QuantParams::new(1.7476615, -17).unwrap();
        let lo = q.dequantize(i8::MIN);
        let hi = q.dequantize(i8::MAX);
        let mut f = lo;
        while f <= hi {
            let back = q.dequantize(q.quantize(f).value);
            assert!(
                (back - f).abs() <= q.scale,
                "round trip of {f} gave {back}"
            );
            f += 0.37;
        }
    }

    #[test]
    fn test_output_dequantize() {
        let q = QuantParams::new(0.00390625, -128).unwrap();
        assert_eq!(q.dequantize(-128), 0.0);
        assert_eq!(q.dequantize(0), 0.5);
        assert!((q.dequantize(127) - 0.99609375).abs() < 1e-6);
    }

    #[test]
    fn test_quantize_slice_counts_saturation() {
        let q = QuantParams::new(1.0, 0).unwrap();
        let mut dst = [0i8; 4];
        let n = q.quantize_slice(&[1.0, 200.0, -3.0, -500.0], &mut dst).unwrap();
        assert_eq!(n, 2);
        assert_eq!(dst, [1, 127, -3, -128]);
        assert!(q.quantize_slice(&[1.0], &mut dst).is_err());
    }

    #[test]
    fn test_requantize_clamps_to_range() {
        assert_eq!(requantize(100, 0.5, 0, (-128, 127)), 50);
        assert_eq!(requantize(1000, 1.0, 0, (-128, 127)), 127);
        assert_eq!(requantize(10, 1.0, -128, (-128, 0)), -118);
        assert_eq!(requantize(-400, 1.0, -128, (-128, 127)), -128);
    }

    #[test]
    fn test_quantized_range_relu6() {
        let q = QuantParams::new(6.0 / 255.0, -128).unwrap();
        assert_eq!(q.quantized_range(0.0, 6.0), (-128, 127));
    }
}
