// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The test loop: load, infer, record, repeat.
//!
//! ```text
//! current = start_index
//! loop:
//!     current >= max_index          → stop
//!     loader.load_next(current)     → NoMoreSamples: stop
//!     runtime.run_inference(sample) → error: skip the sample
//!     writer.record(loaded, output) → error: log, keep going
//!     current = loaded + 1
//! ```
//!
//! Only loader errors the loader itself does not skip end the run. A failed
//! inference or a failed write costs one sample or one batch, never the run.

use crate::{
    ModelRuntime, Ready, RunMetrics, TestbenchConfig, TestbenchError, WriteMode,
};
use dataset::{
    DatasetLoader, FlushState, LoadError, LoaderStats, ResultWriter, Sample, Storage,
    WriterStats,
};
use std::time::Instant;
use tracing::{info, warn};

/// Owns everything one run needs.
pub struct Testbench<S: Storage + Clone> {
    runtime: ModelRuntime<Ready>,
    loader: DatasetLoader<S>,
    writer: ResultWriter<S>,
    config: TestbenchConfig,
}

impl<S: Storage + Clone> Testbench<S> {
    /// Wires an initialized runtime to a loader and writer over `storage`.
    ///
    /// # Errors
    /// Returns [`TestbenchError::Config`] or [`TestbenchError::Load`] if the
    /// configuration is invalid.
    pub fn new(
        runtime: ModelRuntime<Ready>,
        storage: S,
        config: &TestbenchConfig,
    ) -> Result<Self, TestbenchError> {
        config.validate()?;
        let width = runtime.input_len();
        if config.dataset.sample_len() < width {
            return Err(TestbenchError::Config(format!(
                "dataset samples hold {} features, model input needs {width}",
                config.dataset.sample_len()
            )));
        }
        if config.write_mode == WriteMode::Bulk && runtime.output_len() != 1 {
            return Err(TestbenchError::Config(format!(
                "bulk mode needs a single output value, model produces {}",
                runtime.output_len()
            )));
        }

        let writer = ResultWriter::new(
            storage.clone(),
            config.dataset.result_root(),
            config.dataset.num_samples,
        );
        let loader = DatasetLoader::new(storage, config.dataset.clone())?;
        Ok(Self {
            runtime,
            loader,
            writer,
            config: config.clone(),
        })
    }

    /// Runs the loop to the end of the dataset or `max_index`.
    ///
    /// A partial batch left at the end is discarded and counted in
    /// [`RunMetrics::discarded_results`].
    ///
    /// # Errors
    /// Returns [`TestbenchError::Load`] if mounting fails or the loader
    /// reports an error under strict scanning.
    pub fn run(&mut self) -> Result<RunMetrics, TestbenchError> {
        let started = Instant::now();
        let mut metrics = RunMetrics::new();
        self.loader.mount()?;

        let limit = self
            .config
            .max_index
            .map_or(self.config.dataset.num_samples, |m| {
                m.min(self.config.dataset.num_samples)
            });
        let prefix = self.config.result_prefix.clone();
        let interval = self.config.progress_interval;
        let mut sample = Sample::with_capacity(self.config.dataset.sample_len());
        let mut current = self.config.start_index;

        info!(
            start = current,
            limit,
            mode = ?self.config.write_mode,
            "starting test loop"
        );

        while current < limit {
            let loaded = match self.loader.load_next_into(current, &mut sample) {
                Ok(index) => index,
                Err(LoadError::NoMoreSamples { .. }) => break,
                Err(e) => return Err(e.into()),
            };
            if loaded >= limit {
                break;
            }
            metrics.loaded += 1;

            match self.runtime.run_inference(&sample) {
                Ok(output) => {
                    metrics.record_inference(
                        output.duration,
                        output.detection.detected,
                        output.saturated,
                    );
                    self.record(loaded, &output.raw, &prefix, &mut metrics);
                }
                Err(e) => {
                    metrics.failed += 1;
                    warn!(index = loaded, error = %e, "inference failed, skipping sample");
                }
            }

            if loaded % interval == 0 {
                info!("Processed {loaded} samples");
            }
            current = match loaded.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        metrics.discarded_results = self.writer.discard_pending() as u64;
        metrics.next_index = current;
        metrics.finalise(started.elapsed());
        info!("{}", metrics.summary());
        Ok(metrics)
    }

    fn record(&mut self, index: u32, raw: &[i8], prefix: &str, metrics: &mut RunMetrics) {
        match self.config.write_mode {
            WriteMode::Bulk => match self.writer.record_scalar(index, raw, prefix) {
                Ok(FlushState::Flushed { .. }) => metrics.batches_flushed += 1,
                Ok(FlushState::Buffered { .. }) => {}
                Err(e) => {
                    metrics.write_failures += 1;
                    warn!(index, error = %e, "failed to record result");
                }
            },
            WriteMode::PerSample => match self.writer.write_one(index, raw, prefix) {
                Ok(_) => metrics.files_written += 1,
                Err(e) => {
                    metrics.write_failures += 1;
                    warn!(index, error = %e, "failed to write result file");
                }
            },
        }
    }

    pub fn runtime(&self) -> &ModelRuntime<Ready> {
        &self.runtime
    }

    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    /// Hands the runtime back, e.g. to run another dataset through it.
    pub fn into_runtime(self) -> ModelRuntime<Ready> {
        self.runtime
    }
}

impl<S: Storage + Clone + std::fmt::Debug> std::fmt::Debug for Testbench<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Testbench")
            .field("runtime", &self.runtime)
            .field("loader", &self.loader)
            .field("writer", &self.writer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeConfig;
    use accelerator::sim;
    use dataset::{shard, FsStorage};

    fn runtime() -> ModelRuntime<Ready> {
        let (npu, nvic) = sim::simulated(0);
        ModelRuntime::new(RuntimeConfig::default(), Box::new(npu))
            .initialize(nvic.as_ref())
            .unwrap()
    }

    fn write_sample(root: &std::path::Path, index: u32, value: f32) {
        let rel = shard::sample_path("x", index);
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes: Vec<u8> = std::iter::repeat(value.to_le_bytes())
            .take(40)
            .flatten()
            .collect();
        std::fs::write(path, bytes).unwrap();
    }

    fn config(num_samples: u32) -> TestbenchConfig {
        let mut cfg = TestbenchConfig::default();
        cfg.dataset.x_root = "x".into();
        cfg.dataset.y_root = "y".into();
        cfg.dataset.result_root = Some("out".into());
        cfg.dataset.num_samples = num_samples;
        cfg
    }

    #[test]
    fn test_sparse_dataset_loop() {
        let dir = tempfile::tempdir().unwrap();
        for i in [0, 5, 9] {
            write_sample(dir.path(), i, 60.0);
        }
        let storage = FsStorage::new(dir.path());
        let mut bench = Testbench::new(runtime(), storage, &config(10)).unwrap();
        let m = bench.run().unwrap();

        assert_eq!(m.loaded, 3);
        assert_eq!(m.inferred, 3);
        assert_eq!(m.failed, 0);
        assert_eq!(m.batches_flushed, 0);
        assert_eq!(m.discarded_results, 3);
        assert_eq!(bench.loader_stats().missing, 7);
        assert_eq!(bench.runtime().npu_jobs(), 3);
    }

    #[test]
    fn test_max_index_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..6 {
            write_sample(dir.path(), i, 60.0);
        }
        let mut cfg = config(10);
        cfg.max_index = Some(4);
        let mut bench = Testbench::new(runtime(), FsStorage::new(dir.path()), &cfg).unwrap();
        let m = bench.run().unwrap();
        assert_eq!(m.loaded, 4);
        assert_eq!(m.next_index, 4);
    }

    #[test]
    fn test_per_sample_mode_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path(), 2, 60.0);
        let mut cfg = config(4);
        cfg.write_mode = WriteMode::PerSample;
        let mut bench = Testbench::new(runtime(), FsStorage::new(dir.path()), &cfg).unwrap();
        let m = bench.run().unwrap();

        assert_eq!(m.files_written, 1);
        let path = dir
            .path()
            .join(shard::result_path("out", 2, "qdense_bulk_result_"));
        assert_eq!(std::fs::read(path).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_dataset_runs_clean() {
        let dir = tempfile::tempdir().unwrap();
        let mut bench =
            Testbench::new(runtime(), FsStorage::new(dir.path()), &config(16)).unwrap();
        let m = bench.run().unwrap();
        assert_eq!(m.loaded, 0);
        assert_eq!(m.discarded_results, 0);
        assert!(dir.path().join("x").is_dir());
    }

    #[test]
    fn test_rejects_narrow_samples() {
        let mut cfg = config(4);
        cfg.dataset.timesteps = 10;
        let dir = tempfile::tempdir().unwrap();
        let err = Testbench::new(runtime(), FsStorage::new(dir.path()), &cfg).unwrap_err();
        assert!(matches!(err, TestbenchError::Config(_)));
    }
}
