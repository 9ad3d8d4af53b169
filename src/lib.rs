//! A synchronous filesystem contract for an embedded database engine that
//! persists exactly two named files inside a sandboxed host storage area.
//!
//! The host guarantees synchronous per-file reads and writes, but its size
//! and truncate operations may complete either immediately or as a pending
//! result depending on the host implementation. [`TwoFileFileSystem`]
//! reconciles that mismatch behind a uniform synchronous [`FileSystem`]
//! contract: it classifies paths against the two canonical identities,
//! keeps a compact on-disk meta record of existence and logical size, and
//! branches its read/write/truncate logic on a synchronicity mode probed
//! once at bootstrap. Any path outside the two canonical identities is
//! delegated to an injected fallback filesystem such as
//! [`mem_fs::FileSystem`].

use std::fmt;
use std::io;

use thiserror::Error;

pub mod host;
pub mod mem_fs;
mod meta;
mod two_file_fs;

pub use two_file_fs::TwoFileFileSystem;

pub type Result<T> = std::result::Result<T, FsError>;

/// The generic filesystem contract consumed by the database engine.
///
/// Paths are plain strings matched by exact equality; no normalization or
/// case-folding happens anywhere in this crate. Every operation is
/// synchronous from the caller's perspective.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Creates a file. Implementations may restrict which paths are
    /// accepted; see [`TwoFileFileSystem`] for the canonical-only rule.
    fn create_file(&self, path: &str, opts: CreateOptions) -> Result<()>;

    /// Creates a scratch file with a fresh name and returns its path.
    fn create_temporary_file(&self) -> Result<String>;

    fn delete_file(&self, path: &str) -> Result<()>;

    fn exists(&self, path: &str) -> Result<bool>;

    /// Lists every file currently present, in the implementation's own
    /// stable order.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Reads at most `buf.len()` bytes at `offset`, returning how many
    /// bytes were read.
    fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> Result<usize>;

    fn size_of_file(&self, path: &str) -> Result<u64>;

    /// Changes the file length. Growth pads the new positions with zero
    /// bytes.
    fn truncate_file(&self, path: &str, len: u64) -> Result<()>;

    /// Writes `buf` at `offset`, returning how many bytes were written.
    fn write(&self, path: &str, buf: &[u8], offset: u64) -> Result<usize>;

    /// Removes every file.
    fn clear(&self) -> Result<()>;
}

/// Flags for [`FileSystem::create_file`], checked against the file's
/// existence before any mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub error_if_exists: bool,
    pub error_if_missing: bool,
}

impl CreateOptions {
    pub const fn new() -> Self {
        Self {
            error_if_exists: false,
            error_if_missing: false,
        }
    }

    /// Fail with [`FsError::AlreadyExists`] when the file is present.
    pub const fn with_error_if_exists(mut self, error_if_exists: bool) -> Self {
        self.error_if_exists = error_if_exists;
        self
    }

    /// Fail with [`FsError::EntityNotFound`] when the file is absent.
    pub const fn with_error_if_missing(mut self, error_if_missing: bool) -> Self {
        self.error_if_missing = error_if_missing;
        self
    }
}

/// One of the two fixed files the adapter manages.
///
/// Each identity is bound to a canonical path string at build time. The
/// declaration order here is also the meta-record order and the order in
/// which [`FileSystem::list_files`] reports canonical entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    Database,
    Journal,
}

impl FileIdentity {
    pub const ALL: [FileIdentity; 2] = [FileIdentity::Database, FileIdentity::Journal];

    pub const fn canonical_path(self) -> &'static str {
        match self {
            FileIdentity::Database => "/database",
            FileIdentity::Journal => "/database-journal",
        }
    }

    /// Name of the backing file inside the host storage directory.
    pub const fn storage_name(self) -> &'static str {
        match self {
            FileIdentity::Database => "database",
            FileIdentity::Journal => "database-journal",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            FileIdentity::Database => 0,
            FileIdentity::Journal => 1,
        }
    }

    /// Maps a path to an identity by exact, case-sensitive string match.
    pub fn classify(path: &str) -> Option<FileIdentity> {
        FileIdentity::ALL
            .into_iter()
            .find(|id| id.canonical_path() == path)
    }
}

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// File exists
    #[error("file exists")]
    AlreadyExists,
    /// The requested file could not be found
    #[error("entity not found")]
    EntityNotFound,
    /// The provided data is invalid
    #[error("invalid input")]
    InvalidInput,
    /// `create_file` was invoked on a path other than the canonical ones
    #[error("invalid path")]
    InvalidPath,
    /// Something failed when doing IO. These errors can generally not be handled.
    /// It may work if tried again.
    #[error("io error")]
    IOError,
    /// The adapter's internal lock was poisoned
    #[error("lock error")]
    Lock,
    /// The required storage capability is absent from the host
    #[error("unsupported host storage capability")]
    Unsupported,
    /// A host result was still pending where an immediate one was required
    #[error("blocking operation. try again")]
    WouldBlock,
    /// Some other unhandled error. If you see this, it's probably a bug.
    #[error("unknown error found")]
    UnknownError,
}

impl From<io::Error> for FsError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
            io::ErrorKind::NotFound => FsError::EntityNotFound,
            io::ErrorKind::InvalidInput => FsError::InvalidInput,
            io::ErrorKind::Unsupported => FsError::Unsupported,
            io::ErrorKind::WouldBlock => FsError::WouldBlock,
            io::ErrorKind::Other => FsError::IOError,
            _ => FsError::UnknownError,
        }
    }
}
