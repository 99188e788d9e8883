// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The storage driver boundary and its `std::fs` implementation.
//!
//! Paths are `/`-separated strings relative to the mounted volume, the same
//! form a FAT driver accepts. [`FsStorage`] resolves them under a host
//! directory that stands in for the card.

use crate::StorageError;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Block-file API of the removable storage volume.
pub trait Storage {
    /// Reads up to `buf.len()` bytes from the start of `path`.
    ///
    /// Returns the number of bytes read; a value below `buf.len()` means the
    /// file was shorter than the buffer.
    fn read_file(&self, path: &str, buf: &mut [u8]) -> Result<usize>;

    /// Creates or truncates `path` and writes `data` to it.
    ///
    /// Returns the number of bytes that reached the medium.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<usize>;

    /// Creates one directory. The parent must exist.
    ///
    /// # Errors
    /// [`StorageError::AlreadyExists`] if it is already present.
    fn create_dir(&self, path: &str) -> Result<()>;

    /// Returns `true` if `path` names an existing file or directory.
    fn exists(&self, path: &str) -> Result<bool>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn read_file(&self, path: &str, buf: &mut [u8]) -> Result<usize> {
        (**self).read_file(path, buf)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<usize> {
        (**self).write_file(path, data)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        (**self).create_dir(path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn read_file(&self, path: &str, buf: &mut [u8]) -> Result<usize> {
        (**self).read_file(path, buf)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<usize> {
        (**self).write_file(path, data)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        (**self).create_dir(path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path)
    }
}

/// Creates `path` unless it already exists.
pub fn ensure_dir<S: Storage + ?Sized>(storage: &S, path: &str) -> Result<()> {
    match storage.create_dir(path) {
        Ok(()) | Err(StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Storage backed by a directory on the host filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Mounts `root` as the volume. Volume paths resolve beneath it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the host directory backing the volume.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.split('/').filter(|seg| !seg.is_empty()));
        full
    }
}

fn map_io(path: &str, err: io::Error) -> StorageError {
    let path = path.to_string();
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound { path },
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists { path },
        io::ErrorKind::PermissionDenied => StorageError::Denied { path },
        _ => StorageError::Io { path, source: err },
    }
}

impl Storage for FsStorage {
    fn read_file(&self, path: &str, buf: &mut [u8]) -> Result<usize> {
        let mut file = fs::File::open(self.resolve(path)).map_err(|e| map_io(path, e))?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(path, e)),
            }
        }
        Ok(filled)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<usize> {
        let mut file = fs::File::create(self.resolve(path)).map_err(|e| map_io(path, e))?;
        file.write_all(data).map_err(|e| map_io(path, e))?;
        file.flush().map_err(|e| map_io(path, e))?;
        Ok(data.len())
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        fs::create_dir(self.resolve(path)).map_err(|e| map_io(path, e))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        self.resolve(path)
            .try_exists()
            .map_err(|e| map_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsStorage::new(dir.path());
        let mut buf = [0u8; 4];
        let err = fs.read_file("nope/x.bin", &mut buf).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsStorage::new(dir.path());
        fs.create_dir("a").unwrap();
        assert_eq!(fs.write_file("a/f.bin", &[1, 2, 3]).unwrap(), 3);

        let mut buf = [0u8; 8];
        assert_eq!(fs.read_file("a/f.bin", &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);

        let mut small = [0u8; 2];
        assert_eq!(fs.read_file("a/f.bin", &mut small).unwrap(), 2);
    }

    #[test]
    fn test_create_dir_twice() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsStorage::new(dir.path());
        fs.create_dir("d").unwrap();
        assert!(matches!(
            fs.create_dir("d"),
            Err(StorageError::AlreadyExists { .. })
        ));
        ensure_dir(&fs, "d").unwrap();
        assert!(fs.exists("d").unwrap());
    }

    #[test]
    fn test_create_dir_needs_parent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FsStorage::new(dir.path());
        assert!(fs.create_dir("p/q").unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolve_ignores_empty_segments() {
        let fs = FsStorage::new("/mnt/sd");
        assert_eq!(fs.resolve("a//b/"), PathBuf::from("/mnt/sd/a/b"));
    }
}
