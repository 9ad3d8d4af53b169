//! The two-file storage adapter.
//!
//! Routes the generic [`FileSystem`] contract onto dedicated host storage
//! handles for the two canonical files, keeping the meta record in step,
//! and delegates every other path to an injected fallback filesystem.
//! `create_file` is the one asymmetric operation: it accepts only the two
//! canonical paths and never falls back, so scratch files have to go
//! through `create_temporary_file` instead.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::host::{StorageDirectory, StorageHandle};
use crate::meta::{MetaStore, BUFFER_SIZE};
use crate::{CreateOptions, FileIdentity, FileSystem, FsError, Result};

/// Name of the meta record file inside the host storage directory.
const META_FILE: &str = "meta";

/// Two canonical files on host storage handles, everything else on the
/// fallback.
///
/// Construction is asynchronous (see [`TwoFileFileSystem::open_in`] and
/// [`TwoFileFileSystem::open_under_root`]); every operation afterward is
/// synchronous end-to-end. On hosts whose size/truncate are asynchronous
/// the adapter never awaits inside an operation; the meta record carries
/// the logical size instead.
#[derive(Debug)]
pub struct TwoFileFileSystem {
    handles: [Arc<dyn StorageHandle>; 2],
    meta: Mutex<MetaStore>,
    sync_host: bool,
    fallback: Arc<dyn FileSystem>,
}

impl TwoFileFileSystem {
    /// Opens the adapter inside an already-resolved host directory.
    ///
    /// Opens the meta handle and resets its length to the record-buffer
    /// size, opens one handle per [`FileIdentity`], then probes whether the
    /// host answers size queries immediately. The probe result is fixed for
    /// the adapter's lifetime.
    pub async fn open_in(
        dir: &dyn StorageDirectory,
        fallback: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let meta_handle = dir.open_file(META_FILE).await?;
        meta_handle.truncate(BUFFER_SIZE as u64).wait().await?;

        let database = dir.open_file(FileIdentity::Database.storage_name()).await?;
        let journal = dir.open_file(FileIdentity::Journal.storage_name()).await?;

        // Issue a size query and inspect, without waiting, whether the
        // result is immediate or pending.
        let sync_host = !meta_handle.size().is_pending();
        tracing::debug!(sync_host, "probed host synchronicity");

        let mut meta = MetaStore::new(meta_handle);
        meta.load()?;

        Ok(Self {
            handles: [database, journal],
            meta: Mutex::new(meta),
            sync_host,
            fallback,
        })
    }

    /// Opens the adapter under a root storage area, creating intermediate
    /// directories as needed. `path` segments are separated by `/`.
    pub async fn open_under_root(
        root: &dyn StorageDirectory,
        path: &str,
        fallback: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let mut dir: Option<Box<dyn StorageDirectory>> = None;
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            let next = match &dir {
                Some(current) => current.open_dir(segment).await?,
                None => root.open_dir(segment).await?,
            };
            dir = Some(next);
        }

        match &dir {
            Some(leaf) => Self::open_in(leaf.as_ref(), fallback).await,
            None => Self::open_in(root, fallback).await,
        }
    }

    /// Whether the host's size/truncate operations complete immediately.
    pub fn is_host_synchronous(&self) -> bool {
        self.sync_host
    }

    /// Closes every handle the adapter owns. Terminal: the adapter must
    /// not be used afterward.
    pub fn release(&self) -> Result<()> {
        for handle in &self.handles {
            handle.close()?;
        }
        self.lock_meta()?.close()
    }

    fn handle(&self, id: FileIdentity) -> &Arc<dyn StorageHandle> {
        &self.handles[id.index()]
    }

    fn lock_meta(&self) -> Result<MutexGuard<'_, MetaStore>> {
        self.meta.lock().map_err(|_| FsError::Lock)
    }
}

impl FileSystem for TwoFileFileSystem {
    fn create_file(&self, path: &str, opts: CreateOptions) -> Result<()> {
        let Some(id) = FileIdentity::classify(path) else {
            tracing::trace!(path, "create_file on non-canonical path");
            return Err(FsError::InvalidPath);
        };

        let mut meta = self.lock_meta()?;
        let exists = meta.exists(id);
        if opts.error_if_exists && exists {
            return Err(FsError::AlreadyExists);
        }
        if opts.error_if_missing && !exists {
            return Err(FsError::EntityNotFound);
        }

        if !exists {
            meta.mark_created(id)?;
            if self.sync_host {
                // Unsafe to request on asynchronous hosts; there the zero
                // recorded size plus read clamping covers stale bytes.
                self.handle(id).truncate(0).now()?;
            }
            tracing::debug!(path, "created managed file");
        }
        Ok(())
    }

    fn create_temporary_file(&self) -> Result<String> {
        // Canonical identities are never used for scratch storage.
        self.fallback.create_temporary_file()
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        match FileIdentity::classify(path) {
            Some(id) => {
                tracing::debug!(path, "deleted managed file");
                self.lock_meta()?.set_exists(id, false)
            }
            None => self.fallback.delete_file(path),
        }
    }

    fn exists(&self, path: &str) -> Result<bool> {
        match FileIdentity::classify(path) {
            Some(id) => {
                let mut meta = self.lock_meta()?;
                meta.load()?;
                Ok(meta.exists(id))
            }
            None => self.fallback.exists(path),
        }
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        {
            let mut meta = self.lock_meta()?;
            meta.load()?;
            for id in FileIdentity::ALL {
                if meta.exists(id) {
                    files.push(id.canonical_path().to_owned());
                }
            }
        }
        files.extend(self.fallback.list_files()?);
        Ok(files)
    }

    fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize> {
        let Some(id) = FileIdentity::classify(path) else {
            return self.fallback.read(path, buf, offset);
        };

        if self.sync_host {
            return self.handle(id).read_at(buf, offset);
        }

        // The physical file may still hold bytes beyond a pending
        // truncate's logical cutoff; clamp to the recorded size.
        let size = self.lock_meta()?.size(id);
        let len = (buf.len() as u64).min(size.saturating_sub(offset)) as usize;
        if len == 0 {
            return Ok(0);
        }
        self.handle(id).read_at(&mut buf[..len], offset)
    }

    fn size_of_file(&self, path: &str) -> Result<u64> {
        let Some(id) = FileIdentity::classify(path) else {
            return self.fallback.size_of_file(path);
        };

        if self.sync_host {
            self.handle(id).size().now()
        } else {
            Ok(self.lock_meta()?.size(id))
        }
    }

    fn truncate_file(&self, path: &str, len: u64) -> Result<()> {
        let Some(id) = FileIdentity::classify(path) else {
            return self.fallback.truncate_file(path, len);
        };

        let mut meta = self.lock_meta()?;
        if self.sync_host {
            self.handle(id).truncate(len).now()?;
        } else {
            let old = meta.size(id);
            tracing::trace!(path, len, old, "truncate on asynchronous host");
            if len > old {
                // An asynchronous truncate cannot be relied on to have
                // extended the file before this call returns; write the
                // zero tail ourselves.
                let zeros = vec![0u8; (len - old) as usize];
                self.handle(id).write_at(&zeros, old)?;
            }
        }
        // Covers both growth and shrink; on synchronous hosts this is
        // bookkeeping only.
        meta.set_size(id, len)
    }

    fn write(&self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        let Some(id) = FileIdentity::classify(path) else {
            return self.fallback.write(path, buf, offset);
        };

        let written = self.handle(id).write_at(buf, offset)?;
        if !self.sync_host {
            let mut meta = self.lock_meta()?;
            let end = offset + written as u64;
            // Writes only grow the recorded size, never shrink it.
            if end > meta.size(id) {
                meta.set_size(id, end)?;
            }
        }
        Ok(written)
    }

    fn clear(&self) -> Result<()> {
        self.fallback.clear()?;
        self.lock_meta()?.clear_all()
    }
}
