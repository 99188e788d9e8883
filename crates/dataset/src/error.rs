// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for storage access, sample loading and result writing.

/// Errors reported by a [`Storage`](crate::Storage) driver.
///
/// The variants mirror the small status enum a FAT driver returns; `Io`
/// carries anything that does not map onto one of them.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The file or one of its parent directories does not exist.
    #[error("'{path}' not found")]
    NotFound { path: String },

    /// The directory being created already exists.
    #[error("'{path}' already exists")]
    AlreadyExists { path: String },

    /// The driver refused access.
    #[error("access to '{path}' denied")]
    Denied { path: String },

    /// Fewer bytes reached the medium than were requested.
    #[error("short write to '{path}': {written} of {expected} bytes")]
    ShortWrite {
        path: String,
        written: usize,
        expected: usize,
    },

    /// Any other driver failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Returns `true` for errors the loader treats as "no sample here".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Errors returned by [`DatasetLoader`](crate::DatasetLoader).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No readable sample exists in `[start, limit)`. This is the normal end of a run.
    #[error("no samples left in [{start}, {limit})")]
    NoMoreSamples { start: u32, limit: u32 },

    /// A storage error other than "not found" under strict scanning.
    #[error("storage error at index {index} ('{path}'): {source}")]
    Storage {
        index: u32,
        path: String,
        #[source]
        source: StorageError,
    },

    /// The dataset configuration is unusable.
    #[error("invalid dataset configuration: {0}")]
    InvalidConfig(String),

    /// A storage root could not be created while mounting.
    #[error("cannot prepare dataset root: {0}")]
    Mount(#[from] StorageError),
}

/// Errors returned by [`ResultWriter`](crate::ResultWriter).
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The output vector does not have the length the write mode requires.
    #[error("invalid output arity {actual}")]
    InvalidArity { actual: usize },

    /// The index lies outside the dataset.
    #[error("index {index} is outside the dataset (limit {limit})")]
    IndexOutOfRange { index: u32, limit: u32 },

    /// Creating the shard directories or writing the file failed.
    #[error("failed to write '{path}': {source}")]
    FlushFailed {
        path: String,
        #[source]
        source: StorageError,
    },
}

/// Errors returned by [`evaluate`](crate::evaluate::evaluate).
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A ground-truth file could not be read.
    #[error("cannot read label for index {index}: {source}")]
    Label {
        index: u32,
        #[source]
        source: StorageError,
    },

    /// No batch file was found under the result root.
    #[error("no result batches with prefix '{prefix}' found")]
    NoResults { prefix: String },

    /// The dataset configuration is unusable.
    #[error("invalid dataset configuration: {0}")]
    InvalidConfig(String),
}
