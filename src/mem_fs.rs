//! The in-memory fallback filesystem.
//!
//! Handles scratch/temporary files and any path outside the two canonical
//! identities. State is process-local and independent of the host storage
//! area; the adapter and this filesystem never share memory.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::{CreateOptions, FsError, Result};

/// A flat map of path strings to byte vectors; there is no directory
/// structure because the contract never asks for one.
///
/// Cloning is cheap and clones share state, so the same instance can serve
/// as the adapter's fallback and stay inspectable from a test.
#[derive(Debug, Clone, Default)]
pub struct FileSystem {
    inner: Arc<RwLock<FileSystemInner>>,
}

#[derive(Debug, Default)]
struct FileSystemInner {
    // BTreeMap keeps list_files deterministic.
    files: BTreeMap<String, Vec<u8>>,
    next_temporary: usize,
}

impl crate::FileSystem for FileSystem {
    fn create_file(&self, path: &str, opts: CreateOptions) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        let exists = inner.files.contains_key(path);
        if opts.error_if_exists && exists {
            return Err(FsError::AlreadyExists);
        }
        if opts.error_if_missing && !exists {
            return Err(FsError::EntityNotFound);
        }
        if !exists {
            inner.files.insert(path.to_owned(), Vec::new());
        }
        Ok(())
    }

    fn create_temporary_file(&self) -> Result<String> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        // The counter is monotonic for the filesystem's lifetime so names
        // never repeat, even across clear().
        let path = format!("/tmp-{}", inner.next_temporary);
        inner.next_temporary += 1;
        inner.files.insert(path.clone(), Vec::new());
        Ok(path)
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or(FsError::EntityNotFound)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| FsError::Lock)?;
        Ok(inner.files.contains_key(path))
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(|_| FsError::Lock)?;
        Ok(inner.files.keys().cloned().collect())
    }

    fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| FsError::Lock)?;
        let file = inner.files.get(path).ok_or(FsError::EntityNotFound)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::InvalidInput)?;
        if offset >= file.len() {
            return Ok(0);
        }
        let len = buf.len().min(file.len() - offset);
        buf[..len].copy_from_slice(&file[offset..offset + len]);
        Ok(len)
    }

    fn size_of_file(&self, path: &str) -> Result<u64> {
        let inner = self.inner.read().map_err(|_| FsError::Lock)?;
        let file = inner.files.get(path).ok_or(FsError::EntityNotFound)?;
        Ok(file.len() as u64)
    }

    fn truncate_file(&self, path: &str, len: u64) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        let file = inner.files.get_mut(path).ok_or(FsError::EntityNotFound)?;
        let len = usize::try_from(len).map_err(|_| FsError::InvalidInput)?;
        file.resize(len, 0);
        Ok(())
    }

    fn write(&self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        let file = inner.files.get_mut(path).ok_or(FsError::EntityNotFound)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::InvalidInput)?;
        if offset + buf.len() > file.len() {
            file.resize(offset + buf.len(), 0);
        }
        file[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| FsError::Lock)?;
        inner.files.clear();
        Ok(())
    }
}
