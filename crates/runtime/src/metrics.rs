// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Test loop metrics.
//!
//! [`RunMetrics`] counts what happened to every index the loop touched and
//! aggregates inference timing, so a run on the board and a host run can be
//! compared from their summaries alone.

use std::time::Duration;

/// Aggregate metrics for one test loop run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RunMetrics {
    /// Samples returned by the loader.
    pub loaded: u64,
    /// Samples that went through inference successfully.
    pub inferred: u64,
    /// Samples skipped because inference failed.
    pub failed: u64,
    /// Samples classified as AF.
    pub detections: u64,
    /// Input features clamped during quantization, over all samples.
    pub saturated_features: u64,
    /// Result batches written.
    pub batches_flushed: u64,
    /// Per-sample result files written.
    pub files_written: u64,
    /// Writes or flushes that failed.
    pub write_failures: u64,
    /// Buffered results dropped at the end because the batch was not full.
    pub discarded_results: u64,
    /// Index the loop would have scanned next.
    pub next_index: u32,
    /// Total time spent in inference.
    pub total_inference: Duration,
    /// Fastest single inference.
    pub min_inference: Option<Duration>,
    /// Slowest single inference.
    pub max_inference: Duration,
    /// Wall-clock time of the whole run.
    pub wall_time: Duration,
}

impl RunMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successful inference.
    pub fn record_inference(&mut self, duration: Duration, detected: bool, saturated: usize) {
        self.inferred += 1;
        self.detections += u64::from(detected);
        self.saturated_features += saturated as u64;
        self.total_inference += duration;
        self.max_inference = self.max_inference.max(duration);
        self.min_inference = Some(self.min_inference.map_or(duration, |m| m.min(duration)));
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, wall_time: Duration) {
        self.wall_time = wall_time;
    }

    /// Mean inference latency, or zero before the first inference.
    pub fn mean_inference(&self) -> Duration {
        match u32::try_from(self.inferred) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_inference / n,
            Err(_) => Duration::from_secs_f64(
                self.total_inference.as_secs_f64() / self.inferred as f64,
            ),
        }
    }

    /// Samples processed per second of wall time.
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.wall_time.as_secs_f64();
        if secs <= 0.0 || self.inferred == 0 {
            return 0.0;
        }
        self.inferred as f64 / secs
    }

    /// Fraction of inferred samples classified as AF.
    pub fn detection_rate(&self) -> f64 {
        if self.inferred == 0 {
            0.0
        } else {
            self.detections as f64 / self.inferred as f64
        }
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Run: {} loaded, {} inferred, {} failed, {} detected ({:.1}%), \
             {} batches + {} files written, {} write failures, {} discarded, \
             mean {:.3}ms / max {:.3}ms per inference, {:.2}s total ({:.1} samples/s)",
            self.loaded,
            self.inferred,
            self.failed,
            self.detections,
            self.detection_rate() * 100.0,
            self.batches_flushed,
            self.files_written,
            self.write_failures,
            self.discarded_results,
            self.mean_inference().as_secs_f64() * 1000.0,
            self.max_inference.as_secs_f64() * 1000.0,
            self.wall_time.as_secs_f64(),
            self.samples_per_second(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = RunMetrics::new();
        assert_eq!(m.samples_per_second(), 0.0);
        assert_eq!(m.mean_inference(), Duration::ZERO);
        assert_eq!(m.detection_rate(), 0.0);
        assert_eq!(m.min_inference, None);
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = RunMetrics::new();
        m.record_inference(Duration::from_millis(4), true, 0);
        m.record_inference(Duration::from_millis(2), false, 3);
        m.finalise(Duration::from_secs(1));

        assert_eq!(m.inferred, 2);
        assert_eq!(m.detections, 1);
        assert_eq!(m.saturated_features, 3);
        assert_eq!(m.min_inference, Some(Duration::from_millis(2)));
        assert_eq!(m.max_inference, Duration::from_millis(4));
        assert_eq!(m.mean_inference(), Duration::from_millis(3));
        assert!((m.samples_per_second() - 2.0).abs() < 1e-9);
        assert!((m.detection_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_summary_format() {
        let mut m = RunMetrics::new();
        m.loaded = 3;
        m.failed = 1;
        m.record_inference(Duration::from_millis(1), true, 0);
        m.record_inference(Duration::from_millis(1), false, 0);
        let s = m.summary();
        assert!(s.starts_with("Run:"));
        assert!(s.contains("3 loaded"));
        assert!(s.contains("1 failed"));
        assert!(s.contains("50.0%"));
    }
}
