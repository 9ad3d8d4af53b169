//! Host storage capability traits.
//!
//! The host exposes one [`StorageHandle`] per file. Reads and writes are
//! guaranteed synchronous; `size` and `truncate` may complete immediately
//! or as a pending result depending on the host implementation, which is
//! why both return a [`Deferred`]. The adapter probes this once at
//! bootstrap and never again.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{FsError, Result};

/// Outcome of a host call whose completion may be deferred.
///
/// A `Pending` call is already in flight when it is returned; dropping the
/// future abandons the observation of the result, not the operation itself.
/// Whether the host has applied the operation by the time the caller next
/// touches the file is exactly what the meta store compensates for.
pub enum Deferred<T> {
    Ready(Result<T>),
    Pending(BoxFuture<'static, Result<T>>),
}

impl<T> Deferred<T> {
    pub fn ready(value: T) -> Self {
        Deferred::Ready(Ok(value))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Deferred::Pending(_))
    }

    /// Resolves the call without suspending. A pending result yields
    /// [`FsError::WouldBlock`].
    pub fn now(self) -> Result<T> {
        match self {
            Deferred::Ready(result) => result,
            Deferred::Pending(_) => Err(FsError::WouldBlock),
        }
    }

    /// Awaits completion of either arm. Only the bootstrap phase may
    /// suspend, so this is only called there.
    pub async fn wait(self) -> Result<T> {
        match self {
            Deferred::Ready(result) => result,
            Deferred::Pending(future) => future.await,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Ready(_) => f.write_str("Deferred::Ready"),
            Deferred::Pending(_) => f.write_str("Deferred::Pending"),
        }
    }
}

/// Per-file capability supplied by the execution environment.
pub trait StorageHandle: fmt::Debug + Send + Sync + 'static {
    /// Reads up to `buf.len()` bytes at `offset`, returning how many bytes
    /// were read. Always synchronous.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Writes `buf` at `offset`, returning how many bytes were written.
    /// Always synchronous.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize>;

    fn size(&self) -> Deferred<u64>;

    fn truncate(&self, len: u64) -> Deferred<()>;

    fn close(&self) -> Result<()>;
}

/// A directory inside the host storage area, used only during bootstrap to
/// resolve the handles the adapter will own.
///
/// A host that cannot provide a capability reports
/// [`FsError::Unsupported`], which bootstrap propagates fatally.
#[async_trait]
pub trait StorageDirectory: fmt::Debug + Send + Sync {
    /// Opens a child directory by name, creating it if missing.
    async fn open_dir(&self, name: &str) -> Result<Box<dyn StorageDirectory>>;

    /// Opens a file by name, creating it if missing.
    async fn open_file(&self, name: &str) -> Result<Arc<dyn StorageHandle>>;
}
