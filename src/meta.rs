//! The meta-information store.
//!
//! A fixed-size binary side record tracking existence and logical size per
//! managed file. On hosts whose size/truncate operations are asynchronous
//! the physical file may transiently disagree with the logical state; in
//! that mode this record is the source of truth.
//!
//! Layout, 8 bytes per [`FileIdentity`] in declaration order: byte 0 is the
//! exists flag (0/1), bytes 1-3 are reserved, bytes 4-7 hold the size as a
//! big-endian signed 32-bit integer. The buffer is always read and written
//! in full, and every mutator persists before returning so the record on
//! the handle is never stale across a public operation boundary.

use std::sync::Arc;

use crate::host::StorageHandle;
use crate::{FileIdentity, FsError, Result};

pub(crate) const RECORD_SIZE: usize = 8;
pub(crate) const BUFFER_SIZE: usize = RECORD_SIZE * FileIdentity::ALL.len();

const EXISTS_OFFSET: usize = 0;
const SIZE_OFFSET: usize = 4;

#[derive(Debug)]
pub(crate) struct MetaStore {
    handle: Arc<dyn StorageHandle>,
    buf: [u8; BUFFER_SIZE],
}

impl MetaStore {
    pub(crate) fn new(handle: Arc<dyn StorageHandle>) -> Self {
        Self {
            handle,
            buf: [0; BUFFER_SIZE],
        }
    }

    /// Full-buffer read from the meta handle.
    pub(crate) fn load(&mut self) -> Result<()> {
        self.buf.fill(0);
        self.handle.read_at(&mut self.buf, 0)?;
        Ok(())
    }

    /// Full-buffer write-back to the meta handle.
    pub(crate) fn persist(&self) -> Result<()> {
        let written = self.handle.write_at(&self.buf, 0)?;
        if written != self.buf.len() {
            return Err(FsError::IOError);
        }
        Ok(())
    }

    pub(crate) fn exists(&self, id: FileIdentity) -> bool {
        self.buf[id.index() * RECORD_SIZE + EXISTS_OFFSET] != 0
    }

    /// Marking a file non-existent also zeroes its size, atomically with
    /// the flag update.
    pub(crate) fn set_exists(&mut self, id: FileIdentity, exists: bool) -> Result<()> {
        self.buf[id.index() * RECORD_SIZE + EXISTS_OFFSET] = u8::from(exists);
        if !exists {
            self.encode_size(id, 0);
        }
        self.persist()
    }

    /// Sets the exists flag and zeroes the size in one persisted mutation.
    /// A stray size recorded while the flag was unset must not survive
    /// creation.
    pub(crate) fn mark_created(&mut self, id: FileIdentity) -> Result<()> {
        self.buf[id.index() * RECORD_SIZE + EXISTS_OFFSET] = 1;
        self.encode_size(id, 0);
        self.persist()
    }

    /// The recorded size is meaningful only while `exists(id)` is true.
    pub(crate) fn size(&self, id: FileIdentity) -> u64 {
        let at = id.index() * RECORD_SIZE + SIZE_OFFSET;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[at..at + 4]);
        i32::from_be_bytes(raw).max(0) as u64
    }

    pub(crate) fn set_size(&mut self, id: FileIdentity, size: u64) -> Result<()> {
        let size = i32::try_from(size).map_err(|_| FsError::InvalidInput)?;
        self.encode_size(id, size);
        self.persist()
    }

    /// Marks every identity non-existent, persisting once.
    pub(crate) fn clear_all(&mut self) -> Result<()> {
        self.buf = [0; BUFFER_SIZE];
        self.persist()
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.handle.close()
    }

    fn encode_size(&mut self, id: FileIdentity, size: i32) {
        let at = id.index() * RECORD_SIZE + SIZE_OFFSET;
        self.buf[at..at + 4].copy_from_slice(&size.to_be_bytes());
    }
}
