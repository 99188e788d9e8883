// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Forward scan over a sparsely populated, hex-sharded dataset.
//!
//! Indices form a dense space `[0, N)` but only some have files on the
//! card. [`DatasetLoader::load_next_into`] probes `start`, `start + 1`, …
//! and returns the first index whose file(s) read completely.

use crate::sample::decode_into;
use crate::shard::{label_path, sample_path};
use crate::storage::{ensure_dir, Storage};
use crate::{DatasetConfig, LoadError, Sample, StorageError};
use tracing::{debug, info, warn};

/// Counters describing what a scan has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Indices probed, including the ones that loaded.
    pub probed: u64,
    /// Samples returned.
    pub loaded: u64,
    /// Indices skipped because a file was absent.
    pub missing: u64,
    /// Indices skipped because a file was shorter than expected.
    pub short: u64,
    /// Indices skipped because of other storage errors.
    pub errors: u64,
}

enum Probe {
    Loaded,
    Skip,
}

/// Reads samples from a [`Storage`] volume.
pub struct DatasetLoader<S: Storage> {
    storage: S,
    config: DatasetConfig,
    scratch: Vec<u8>,
    stats: LoaderStats,
}

impl<S: Storage> DatasetLoader<S> {
    /// Creates a loader over `storage`.
    ///
    /// # Errors
    /// [`LoadError::InvalidConfig`] if the configuration fails validation.
    pub fn new(storage: S, config: DatasetConfig) -> Result<Self, LoadError> {
        config.validate()?;
        let scratch = vec![0u8; config.sample_bytes()];
        Ok(Self {
            storage,
            config,
            scratch,
            stats: LoaderStats::default(),
        })
    }

    /// Makes sure both roots exist, creating them when configured to.
    ///
    /// A freshly created root is empty, so a later scan simply finds no samples.
    pub fn mount(&self) -> Result<(), LoadError> {
        for root in [&self.config.x_root, &self.config.y_root] {
            if self.storage.exists(root)? {
                continue;
            }
            if self.config.create_roots {
                info!(root = %root, "creating missing dataset root");
                ensure_dir(&self.storage, root)?;
            } else {
                warn!(root = %root, "dataset root does not exist");
            }
        }
        Ok(())
    }

    /// Returns the loader configuration.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Returns the scan counters.
    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Loads the first available sample at or after `start` into `sample`.
    ///
    /// Returns the index that was loaded, which is never below `start`.
    /// Callers continue with `loaded + 1`.
    ///
    /// # Errors
    /// - [`LoadError::NoMoreSamples`] when `[start, N)` holds nothing readable.
    /// - [`LoadError::Storage`] for non-"not found" failures when `strict_scan` is set.
    pub fn load_next_into(&mut self, start: u32, sample: &mut Sample) -> Result<u32, LoadError> {
        let limit = self.config.num_samples;
        for index in start..limit {
            self.stats.probed += 1;
            if let Probe::Loaded = self.probe(index, sample)? {
                self.stats.loaded += 1;
                debug!(index, "loaded sample");
                return Ok(index);
            }
        }
        Err(LoadError::NoMoreSamples { start, limit })
    }

    /// Allocating form of [`load_next_into`](Self::load_next_into).
    pub fn load_next(&mut self, start: u32) -> Result<(Sample, u32), LoadError> {
        let mut sample = Sample::with_capacity(self.config.sample_len());
        let index = self.load_next_into(start, &mut sample)?;
        Ok((sample, index))
    }

    fn probe(&mut self, index: u32, sample: &mut Sample) -> Result<Probe, LoadError> {
        let path = sample_path(&self.config.x_root, index);
        let read = self.storage.read_file(&path, &mut self.scratch);
        let expected = self.scratch.len();
        let Some(features_bytes) = self.check_read(index, path, read, expected)? else {
            return Ok(Probe::Skip);
        };

        let mut label = None;
        let mut label_bytes = 0;
        if self.config.read_ground_truth {
            let path = label_path(&self.config.y_root, index);
            let mut word = [0u8; 4];
            let read = self.storage.read_file(&path, &mut word);
            match self.check_read(index, path, read, word.len())? {
                Some(n) => {
                    label = Some(f32::from_le_bytes(word));
                    label_bytes = n;
                }
                None => return Ok(Probe::Skip),
            }
        }

        decode_into(&self.scratch[..features_bytes], &mut sample.features);
        sample.features_bytes = features_bytes;
        sample.label = label;
        sample.label_bytes = label_bytes;
        Ok(Probe::Loaded)
    }

    /// Classifies one read: `Some(len)` if the file filled its buffer,
    /// `None` if the index should be skipped.
    fn check_read(
        &mut self,
        index: u32,
        path: String,
        read: Result<usize, StorageError>,
        expected: usize,
    ) -> Result<Option<usize>, LoadError> {
        match read {
            Ok(n) if n == expected => Ok(Some(n)),
            Ok(n) => {
                self.stats.short += 1;
                debug!(index, path = %path, read = n, expected, "short sample file, skipping");
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                self.stats.missing += 1;
                Ok(None)
            }
            Err(source) if self.config.strict_scan => Err(LoadError::Storage {
                index,
                path,
                source,
            }),
            Err(e) => {
                self.stats.errors += 1;
                warn!(index, path = %path, error = %e, "storage error, treating sample as missing");
                Ok(None)
            }
        }
    }
}

impl<S: Storage + std::fmt::Debug> std::fmt::Debug for DatasetLoader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("storage", &self.storage)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}
