//! Error types for SQLFS
//!
//! Two layers: [`FsError`] is what the repository, resolver and content
//! store return; [`Errno`] is the coarse code reported to the kernel bridge.
//! Store failures and type mismatches collapse into `Errno::Io` at the
//! boundary, and the collapsed detail is logged rather than surfaced.

use thiserror::Error;
use tracing::{error, warn};

/// Result type for SQLFS internals
pub type Result<T> = std::result::Result<T, FsError>;

/// Result type for the operation surface
pub type FsResult<T> = std::result::Result<T, Errno>;

/// Internal error taxonomy
#[derive(Error, Debug)]
pub enum FsError {
    #[error("no such entry: {0}")]
    NotFound(String),

    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    #[error("directory {0} is not empty")]
    DirectoryNotEmpty(i64),

    #[error("inode {inode} is not a {expected}")]
    TypeMismatch { inode: i64, expected: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("SQLx error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl FsError {
    pub(crate) fn type_mismatch(inode: i64, expected: &'static str) -> Self {
        FsError::TypeMismatch { inode, expected }
    }

    /// Classify a store error raised by an insert, turning a violated
    /// uniqueness constraint into `AlreadyExists`.
    pub(crate) fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                FsError::AlreadyExists(what.into())
            }
            _ => FsError::Store(err),
        }
    }
}

/// Filesystem error code reported for a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    NotFound,
    AlreadyExists,
    DirectoryNotEmpty,
    InvalidArgument,
    Io,
}

impl Errno {
    /// The POSIX errno value for this code.
    pub fn raw(self) -> i32 {
        match self {
            Errno::NotFound => libc::ENOENT,
            Errno::AlreadyExists => libc::EEXIST,
            Errno::DirectoryNotEmpty => libc::ENOTEMPTY,
            Errno::InvalidArgument => libc::EINVAL,
            Errno::Io => libc::EIO,
        }
    }
}

impl std::fmt::Display for Errno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Errno::NotFound => "ENOENT",
            Errno::AlreadyExists => "EEXIST",
            Errno::DirectoryNotEmpty => "ENOTEMPTY",
            Errno::InvalidArgument => "EINVAL",
            Errno::Io => "EIO",
        };
        f.write_str(name)
    }
}

impl std::error::Error for Errno {}

impl From<FsError> for Errno {
    fn from(err: FsError) -> Self {
        match err {
            FsError::NotFound(_) => Errno::NotFound,
            FsError::AlreadyExists(_) => Errno::AlreadyExists,
            FsError::DirectoryNotEmpty(_) => Errno::DirectoryNotEmpty,
            FsError::InvalidArgument(msg) => {
                warn!("rejecting request: {}", msg);
                Errno::InvalidArgument
            }
            e @ FsError::TypeMismatch { .. } => {
                warn!("{}", e);
                Errno::Io
            }
            e @ (FsError::Store(_)
            | FsError::Serialization(_)
            | FsError::Migration(_)
            | FsError::Connection(_)) => {
                error!("{}", e);
                Errno::Io
            }
        }
    }
}
