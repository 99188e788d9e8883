// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Offline scoring of flushed result batches against ground truth.
//!
//! Each batch file covers one shard block, so entry `k` of the file in
//! `<s1>/<s2>` belongs to index `(s1 << 16) | (s2 << 8) | k`. That
//! attribution only holds when the run saw every index of the block, i.e.
//! for densely populated datasets.

use crate::sample::is_positive_label;
use crate::shard::{batch_path, label_path, SHARD_BLOCK};
use crate::storage::Storage;
use crate::writer::BATCH_CAPACITY;
use crate::{DatasetConfig, EvalError, StorageError};
use std::fmt;
use std::io::{self, Write};
use tensor_core::QuantParams;
use tracing::{debug, info, warn};

/// Threshold the firmware classifies against.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Binary confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Confusion {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl Confusion {
    fn tally(pairs: &[(f32, bool)], threshold: f32) -> Self {
        let mut c = Self::default();
        for &(score, positive) in pairs {
            match (score >= threshold, positive) {
                (true, true) => c.tp += 1,
                (true, false) => c.fp += 1,
                (false, false) => c.tn += 1,
                (false, true) => c.fn_ += 1,
            }
        }
        c
    }

    /// Total number of classified samples.
    pub fn total(&self) -> u64 {
        self.tp + self.fp + self.tn + self.fn_
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Classifier metrics at one decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ThresholdMetrics {
    pub threshold: f32,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: Confusion,
}

impl ThresholdMetrics {
    /// Scores `pairs` of `(score, is_positive)` at `threshold`.
    ///
    /// Undefined ratios (no predicted or actual positives) are reported as zero.
    pub fn compute(pairs: &[(f32, bool)], threshold: f32) -> Self {
        let c = Confusion::tally(pairs, threshold);
        let precision = ratio(c.tp, c.tp + c.fp);
        let recall = ratio(c.tp, c.tp + c.fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            threshold,
            accuracy: ratio(c.tp + c.tn, c.total()),
            precision,
            recall,
            f1,
            confusion: c,
        }
    }
}

impl fmt::Display for ThresholdMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "threshold={:.4} accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} \
             [TN={} FP={} FN={} TP={}]",
            self.threshold,
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.confusion.tn,
            self.confusion.fp,
            self.confusion.fn_,
            self.confusion.tp,
        )
    }
}

/// Picks the threshold with the highest F1 among the observed scores.
///
/// Ties keep the lowest threshold. With a single class present there is
/// no curve to optimise and [`DEFAULT_THRESHOLD`] is used.
pub fn optimal_threshold(pairs: &[(f32, bool)]) -> ThresholdMetrics {
    let positives = pairs.iter().filter(|(_, p)| *p).count();
    if positives == 0 || positives == pairs.len() {
        return ThresholdMetrics::compute(pairs, DEFAULT_THRESHOLD);
    }
    let mut candidates: Vec<f32> = pairs.iter().map(|(s, _)| *s).collect();
    candidates.sort_by(f32::total_cmp);
    candidates.dedup();

    let mut best = ThresholdMetrics::compute(pairs, candidates[0]);
    for &t in &candidates[1..] {
        let m = ThresholdMetrics::compute(pairs, t);
        if m.f1 > best.f1 {
            best = m;
        }
    }
    best
}

/// Area under the ROC curve of `pairs`, from the rank-sum statistic.
///
/// Tied scores share their average rank. Returns `None` unless both
/// classes are present.
pub fn roc_auc(pairs: &[(f32, bool)]) -> Option<f64> {
    let positives = pairs.iter().filter(|(_, p)| *p).count();
    let negatives = pairs.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut positive_rank_sum = 0.0f64;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].0 == sorted[start].0 {
            end += 1;
        }
        // Ranks are 1-based; a tie group spanning [start, end) shares the mean.
        let rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = sorted[start..end].iter().filter(|(_, p)| *p).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }
    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Average precision of `pairs`: precision at each distinct score,
/// weighted by the recall gained there.
///
/// Zero when there are no positives.
pub fn average_precision(pairs: &[(f32, bool)]) -> f64 {
    let positives = pairs.iter().filter(|(_, p)| *p).count();
    if positives == 0 {
        return 0.0;
    }
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| b.0.total_cmp(&a.0));

    let (mut tp, mut fp) = (0u64, 0u64);
    let (mut ap, mut last_recall) = (0.0f64, 0.0f64);
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start;
        while end < sorted.len() && sorted[end].0 == sorted[start].0 {
            if sorted[end].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            end += 1;
        }
        let recall = tp as f64 / positives as f64;
        ap += (recall - last_recall) * ratio(tp, tp + fp);
        last_recall = recall;
        start = end;
    }
    ap
}

/// One scored sample.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SampleRecord {
    pub index: u32,
    /// Dequantized score in `[0, 1]`.
    pub score: f32,
    /// Raw `y_test_*` value (AF beat count).
    pub label: f32,
    pub positive: bool,
}

/// Result of scoring a results tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EvaluationReport {
    /// Batch files read and attributed.
    pub batches_read: u64,
    /// Batch files present but skipped (wrong length or unreadable).
    pub batches_skipped: u64,
    /// Scores paired with a label.
    pub scored: u64,
    /// Scores with no readable label.
    pub unlabeled: u64,
    /// Positive labels among the scored samples.
    pub positives: u64,
    /// Metrics at [`DEFAULT_THRESHOLD`].
    pub at_default: ThresholdMetrics,
    /// Metrics at the F1-optimal threshold.
    pub optimal: ThresholdMetrics,
    /// `None` when only one class was scored.
    pub roc_auc: Option<f64>,
    pub average_precision: f64,
    /// Every scored sample in index order.
    #[serde(skip)]
    pub records: Vec<SampleRecord>,
}

impl EvaluationReport {
    /// Returns a multi-line human-readable summary.
    pub fn summary(&self) -> String {
        let auc = match self.roc_auc {
            Some(auc) => format!("{auc:.4}"),
            None => "n/a".to_string(),
        };
        format!(
            "Evaluation: {} samples ({} positive) from {} batches ({} skipped, {} unlabeled)\n  \
             default: {}\n  optimal: {}\n  roc_auc={} ap={:.4}",
            self.scored,
            self.positives,
            self.batches_read,
            self.batches_skipped,
            self.unlabeled,
            self.at_default,
            self.optimal,
            auc,
            self.average_precision,
        )
    }

    /// Writes one CSV row per scored sample, classified at the optimal
    /// threshold.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        let threshold = self.optimal.threshold;
        writeln!(
            out,
            "index,prediction,ground_truth,ground_truth_binary,prediction_binary,correct"
        )?;
        for r in &self.records {
            let predicted = r.score >= threshold;
            writeln!(
                out,
                "{},{},{},{},{},{}",
                r.index,
                r.score,
                r.label,
                u8::from(r.positive),
                u8::from(predicted),
                predicted == r.positive,
            )?;
        }
        out.flush()
    }
}

/// Reads every batch with `prefix` for indices `[0, N)` and scores it
/// against the `y_test_*` labels.
///
/// Raw values are dequantized with `output` and clamped to `[0, 1]`.
///
/// # Errors
/// - [`EvalError::NoResults`] if no labelled score was found.
/// - [`EvalError::Label`] if a label file exists but cannot be read.
pub fn evaluate<S: Storage + ?Sized>(
    storage: &S,
    config: &DatasetConfig,
    prefix: &str,
    output: QuantParams,
) -> Result<EvaluationReport, EvalError> {
    config
        .validate()
        .map_err(|e| EvalError::InvalidConfig(e.to_string()))?;
    output
        .validate()
        .map_err(|e| EvalError::InvalidConfig(e.to_string()))?;

    let root = config.result_root();
    let limit = config.num_samples;
    let mut records = Vec::new();
    let (mut batches_read, mut batches_skipped, mut unlabeled) = (0u64, 0u64, 0u64);
    // One extra byte tells an over-long file from an exact one.
    let mut buf = [0u8; BATCH_CAPACITY + 1];

    for block_start in (0..limit).step_by(SHARD_BLOCK as usize) {
        let path = batch_path(root, block_start, prefix);
        let n = match storage.read_file(&path, &mut buf) {
            Ok(n) => n,
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                warn!(path = %path, error = %e, "cannot read result batch, skipping");
                batches_skipped += 1;
                continue;
            }
        };
        if n != BATCH_CAPACITY {
            warn!(path = %path, len = n, "result batch has the wrong length, skipping");
            batches_skipped += 1;
            continue;
        }
        batches_read += 1;
        debug!(path = %path, block_start, "scoring batch");

        for (k, &raw) in buf[..BATCH_CAPACITY].iter().enumerate() {
            let index = block_start + k as u32;
            if index >= limit {
                break;
            }
            let score = output.dequantize(raw as i8).clamp(0.0, 1.0);
            match read_label(storage, &config.y_root, index)? {
                Some(label) => records.push(SampleRecord {
                    index,
                    score,
                    label,
                    positive: is_positive_label(label),
                }),
                None => unlabeled += 1,
            }
        }
    }

    if records.is_empty() {
        return Err(EvalError::NoResults {
            prefix: prefix.to_string(),
        });
    }
    let pairs: Vec<(f32, bool)> = records.iter().map(|r| (r.score, r.positive)).collect();

    let report = EvaluationReport {
        batches_read,
        batches_skipped,
        scored: pairs.len() as u64,
        unlabeled,
        positives: pairs.iter().filter(|(_, p)| *p).count() as u64,
        at_default: ThresholdMetrics::compute(&pairs, DEFAULT_THRESHOLD),
        optimal: optimal_threshold(&pairs),
        roc_auc: roc_auc(&pairs),
        average_precision: average_precision(&pairs),
        records,
    };
    info!(
        scored = report.scored,
        f1 = report.at_default.f1,
        best_threshold = report.optimal.threshold,
        roc_auc = ?report.roc_auc,
        "evaluation complete"
    );
    Ok(report)
}

fn read_label<S: Storage + ?Sized>(
    storage: &S,
    y_root: &str,
    index: u32,
) -> Result<Option<f32>, EvalError> {
    let path = label_path(y_root, index);
    let mut word = [0u8; 4];
    match storage.read_file(&path, &mut word) {
        Ok(4) => Ok(Some(f32::from_le_bytes(word))),
        Ok(_) => Ok(None),
        Err(StorageError::NotFound { .. }) => Ok(None),
        Err(source) => Err(EvalError::Label { index, source }),
    }
}
