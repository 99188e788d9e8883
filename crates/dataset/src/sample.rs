// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One loaded input sample.

/// Features (and optionally the ground-truth label) of one dataset index.
///
/// The loader fills a caller-owned `Sample` in place, so a test loop
/// allocates the feature buffer once and reuses it for every index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// Row-major `timesteps × features` values.
    pub features: Vec<f32>,
    /// Ground truth, when the loader was asked to read it.
    pub label: Option<f32>,
    /// Bytes read for the features.
    pub features_bytes: usize,
    /// Bytes read for the label (zero when no label was read).
    pub label_bytes: usize,
}

impl Sample {
    /// Creates an empty sample with room for `len` features.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            features: Vec::with_capacity(len),
            ..Self::default()
        }
    }

    /// Creates a sample from in-memory features.
    pub fn from_features(features: Vec<f32>) -> Self {
        let features_bytes = features.len() * std::mem::size_of::<f32>();
        Self {
            features,
            label: None,
            features_bytes,
            label_bytes: 0,
        }
    }

    /// Number of feature values.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` when the sample holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns `true` when the label marks the positive class (`label ≥ 1`).
    pub fn is_positive(&self) -> Option<bool> {
        self.label.map(is_positive_label)
    }
}

/// Ground-truth files hold a beat count; one or more means positive.
pub fn is_positive_label(label: f32) -> bool {
    label >= 1.0
}

/// Decodes little-endian `f32` words from `bytes` into `out`, replacing its contents.
pub(crate) fn decode_into(bytes: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
    );
}
