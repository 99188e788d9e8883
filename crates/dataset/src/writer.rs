// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Result persistence: 256-entry batches or one file per sample.
//!
//! In bulk mode each scalar output is buffered; when the buffer holds
//! [`BATCH_CAPACITY`] values it is written as one raw `i8` file named after
//! the shard of the last index recorded. A partial batch is never written.

use crate::shard::{batch_path, outer_dir, result_path, shard_dir, MAX_INDEX_SPACE};
use crate::storage::{ensure_dir, Storage};
use crate::{StorageError, WriteError};
use tracing::{debug, info, warn};

/// Number of scalar results in one batch file.
pub const BATCH_CAPACITY: usize = 256;

/// Outcome of a successful [`ResultWriter::record_scalar`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushState {
    /// The value was buffered; `pending` values await the next flush.
    Buffered { pending: usize },
    /// The batch filled up and was written to `path`.
    Flushed { path: String },
}

/// Counters describing what the writer has persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Scalars accepted into the batch.
    pub recorded: u64,
    /// Batch files written.
    pub batches_flushed: u64,
    /// Batches lost to a failed flush.
    pub batches_failed: u64,
    /// Per-sample files written.
    pub files_written: u64,
    /// Per-sample writes that failed.
    pub files_failed: u64,
}

/// Writes inference results beneath one storage root.
pub struct ResultWriter<S: Storage> {
    storage: S,
    root: String,
    limit: u32,
    batch: [i8; BATCH_CAPACITY],
    count: usize,
    stats: WriterStats,
}

impl<S: Storage> ResultWriter<S> {
    /// Creates a writer for indices in `[0, limit)` under `root`.
    pub fn new(storage: S, root: impl Into<String>, limit: u32) -> Self {
        Self {
            storage,
            root: root.into(),
            limit: limit.min(MAX_INDEX_SPACE),
            batch: [0; BATCH_CAPACITY],
            count: 0,
            stats: WriterStats::default(),
        }
    }

    /// Returns the result root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of values buffered since the last flush.
    pub fn pending(&self) -> usize {
        self.count
    }

    /// Returns the writer counters.
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Drops the buffered partial batch and returns how many values it held.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.count;
        if dropped > 0 {
            warn!(dropped, "discarding partial result batch");
        }
        self.count = 0;
        dropped
    }

    /// Buffers the single output value of `index` and flushes a full batch.
    ///
    /// The batch counter is reset after every flush attempt, successful or not.
    ///
    /// # Errors
    /// - [`WriteError::InvalidArity`] unless `values` has exactly one element.
    /// - [`WriteError::IndexOutOfRange`] if `index` is outside the dataset.
    /// - [`WriteError::FlushFailed`] if writing the full batch failed; its values are lost.
    pub fn record_scalar(
        &mut self,
        index: u32,
        values: &[i8],
        prefix: &str,
    ) -> Result<FlushState, WriteError> {
        let [value] = values else {
            return Err(WriteError::InvalidArity {
                actual: values.len(),
            });
        };
        self.check_index(index)?;

        self.batch[self.count] = *value;
        self.count += 1;
        self.stats.recorded += 1;
        if self.count < BATCH_CAPACITY {
            return Ok(FlushState::Buffered {
                pending: self.count,
            });
        }

        let path = batch_path(&self.root, index, prefix);
        let result = self.persist(index, &path, bytemuck::cast_slice(&self.batch));
        self.count = 0;
        match result {
            Ok(()) => {
                self.stats.batches_flushed += 1;
                info!(path = %path, last_index = index, "flushed result batch");
                Ok(FlushState::Flushed { path })
            }
            Err(source) => {
                self.stats.batches_failed += 1;
                warn!(path = %path, error = %source, "result batch flush failed");
                Err(WriteError::FlushFailed { path, source })
            }
        }
    }

    /// Writes the output vector of `index` to its own file immediately.
    ///
    /// # Errors
    /// - [`WriteError::IndexOutOfRange`] if `index` is outside the dataset.
    /// - [`WriteError::InvalidArity`] if `values` is empty.
    /// - [`WriteError::FlushFailed`] if the directories or file could not be written.
    pub fn write_one(&mut self, index: u32, values: &[i8], prefix: &str) -> Result<String, WriteError> {
        self.check_index(index)?;
        if values.is_empty() {
            return Err(WriteError::InvalidArity { actual: 0 });
        }
        let path = result_path(&self.root, index, prefix);
        match self.persist(index, &path, bytemuck::cast_slice(values)) {
            Ok(()) => {
                self.stats.files_written += 1;
                debug!(path = %path, index, "wrote result file");
                Ok(path)
            }
            Err(source) => {
                self.stats.files_failed += 1;
                Err(WriteError::FlushFailed { path, source })
            }
        }
    }

    fn check_index(&self, index: u32) -> Result<(), WriteError> {
        if index >= self.limit {
            return Err(WriteError::IndexOutOfRange {
                index,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn persist(&self, index: u32, path: &str, data: &[u8]) -> Result<(), StorageError> {
        if !self.root.is_empty() {
            ensure_dir(&self.storage, &self.root)?;
        }
        ensure_dir(&self.storage, &outer_dir(&self.root, index))?;
        ensure_dir(&self.storage, &shard_dir(&self.root, index))?;
        let written = self.storage.write_file(path, data)?;
        if written != data.len() {
            return Err(StorageError::ShortWrite {
                path: path.to_string(),
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }
}

impl<S: Storage + std::fmt::Debug> std::fmt::Debug for ResultWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWriter")
            .field("storage", &self.storage)
            .field("root", &self.root)
            .field("pending", &self.count)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use std::cell::Cell;

    const PREFIX: &str = "qdense_bulk_result_";

    /// Storage whose writes report fewer bytes than requested while armed.
    struct Truncating {
        inner: FsStorage,
        armed: Cell<bool>,
    }

    impl Storage for Truncating {
        fn read_file(&self, path: &str, buf: &mut [u8]) -> crate::storage::Result<usize> {
            self.inner.read_file(path, buf)
        }
        fn write_file(&self, path: &str, data: &[u8]) -> crate::storage::Result<usize> {
            let n = self.inner.write_file(path, data)?;
            Ok(if self.armed.get() { n / 2 } else { n })
        }
        fn create_dir(&self, path: &str) -> crate::storage::Result<()> {
            self.inner.create_dir(path)
        }
        fn exists(&self, path: &str) -> crate::storage::Result<bool> {
            self.inner.exists(path)
        }
    }

    #[test]
    fn test_flush_at_exactly_256() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 1_000);
        for i in 0..255u32 {
            let state = w.record_scalar(i, &[1], PREFIX).unwrap();
            assert_eq!(state, FlushState::Buffered { pending: i as usize + 1 });
        }
        let state = w.record_scalar(255, &[1], PREFIX).unwrap();
        assert_eq!(
            state,
            FlushState::Flushed {
                path: "out/00/00/qdense_bulk_result_.bin".into()
            }
        );
        assert_eq!(w.pending(), 0);
        // The 257th value starts a fresh batch.
        assert_eq!(
            w.record_scalar(256, &[1], PREFIX).unwrap(),
            FlushState::Buffered { pending: 1 }
        );
    }

    #[test]
    fn test_flushed_bytes_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 1_000);
        for i in 0..256u32 {
            w.record_scalar(i, &[i as u8 as i8], PREFIX).unwrap();
        }
        let bytes = std::fs::read(dir.path().join("out/00/00/qdense_bulk_result_.bin")).unwrap();
        let expected: Vec<u8> = (0..=255u8).collect();
        assert_eq!(bytes, expected);
        assert_eq!(w.stats().batches_flushed, 1);
    }

    #[test]
    fn test_batch_named_after_last_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 100_000);
        // Sparse indices straddling a shard boundary land in the last one's shard.
        for k in 0..256u32 {
            w.record_scalar(200 + k * 2, &[0], PREFIX).unwrap();
        }
        assert!(dir.path().join("out/00/02/qdense_bulk_result_.bin").is_file());
        assert!(!dir.path().join("out/00/00/qdense_bulk_result_.bin").exists());
    }

    #[test]
    fn test_invalid_arity() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 10);
        assert!(matches!(
            w.record_scalar(0, &[1, 2], PREFIX),
            Err(WriteError::InvalidArity { actual: 2 })
        ));
        assert!(matches!(
            w.record_scalar(0, &[], PREFIX),
            Err(WriteError::InvalidArity { actual: 0 })
        ));
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_short_write_resets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Truncating {
            inner: FsStorage::new(dir.path()),
            armed: Cell::new(true),
        };
        let mut w = ResultWriter::new(storage, "out", 1_000);
        for i in 0..255u32 {
            w.record_scalar(i, &[0], PREFIX).unwrap();
        }
        match w.record_scalar(255, &[0], PREFIX) {
            Err(WriteError::FlushFailed { source, .. }) => {
                assert!(matches!(
                    source,
                    StorageError::ShortWrite { written: 128, expected: 256, .. }
                ));
            }
            other => panic!("expected flush failure, got {other:?}"),
        }
        assert_eq!(w.pending(), 0);
        assert_eq!(w.stats().batches_failed, 1);
    }

    #[test]
    fn test_write_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 100);
        let path = w.write_one(7, &[-1, 2], "r_").unwrap();
        assert_eq!(path, "out/00/00/r_000007.bin");
        assert_eq!(std::fs::read(dir.path().join(&path)).unwrap(), vec![0xff, 2]);

        assert!(matches!(
            w.write_one(100, &[1], "r_"),
            Err(WriteError::IndexOutOfRange { index: 100, limit: 100 })
        ));
        assert!(matches!(
            w.write_one(1, &[], "r_"),
            Err(WriteError::InvalidArity { actual: 0 })
        ));
        assert_eq!(w.stats().files_written, 1);
    }

    #[test]
    fn test_discard_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ResultWriter::new(FsStorage::new(dir.path()), "out", 100);
        for i in 0..10 {
            w.record_scalar(i, &[0], PREFIX).unwrap();
        }
        assert_eq!(w.discard_pending(), 10);
        assert_eq!(w.pending(), 0);
        assert!(!dir.path().join("out").exists());
    }
}
