// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # dataset
//!
//! Storage-side half of the testbench.
//!
//! - [`DatasetLoader`]: scans a sparsely populated, hex-sharded tree for the
//!   next readable sample at or after an index.
//! - [`ResultWriter`]: buffers scalar outputs into 256-entry batch files,
//!   or writes one file per sample.
//! - [`evaluate`]: scores flushed batches against ground-truth labels.
//! - [`Storage`]: the block-file driver boundary; [`FsStorage`] maps it onto
//!   a host directory.
//!
//! # Example
//! ```no_run
//! use dataset::{DatasetConfig, DatasetLoader, FsStorage, Sample};
//!
//! let storage = FsStorage::new("/media/sd");
//! let mut loader = DatasetLoader::new(storage, DatasetConfig::default()).unwrap();
//! loader.mount().unwrap();
//! let mut sample = Sample::default();
//! let index = loader.load_next_into(0, &mut sample).unwrap();
//! println!("first sample at {index}: {} features", sample.len());
//! ```

mod config;
mod error;
pub mod evaluate;
mod loader;
mod sample;
pub mod shard;
pub mod storage;
mod writer;

pub use config::{DatasetConfig, DEFAULT_ROOT};
pub use error::{EvalError, LoadError, StorageError, WriteError};
pub use evaluate::{EvaluationReport, SampleRecord, ThresholdMetrics};
pub use loader::{DatasetLoader, LoaderStats};
pub use sample::{is_positive_label, Sample};
pub use shard::{ShardPrefix, MAX_INDEX_SPACE};
pub use storage::{FsStorage, Storage};
pub use writer::{FlushState, ResultWriter, WriterStats, BATCH_CAPACITY};
