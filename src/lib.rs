//! # SQLFS - A POSIX-like Filesystem Stored in SQL
//!
//! SQLFS keeps an entire hierarchical filesystem, metadata and content,
//! inside a transactional relational database reached through SQLx. A
//! kernel bridge such as FUSE drives it through [`FileSystemOps`].
//!
//! ## Storage
//!
//! - `inodes`: one JSON metadata document per inode
//! - `tree`: `(parent, name) -> inode` edges, unique per directory
//! - `data_blocks`: file content in [`BLOCK_SIZE`] chunks
//!
//! The root directory is inode [`ROOT_INO`] and never appears as a child.
//!
//! ## Backends
//!
//! - **SQLite**: Embedded, single-file database (default feature)
//! - **PostgreSQL**: Remote database, including CockroachDB (`postgres` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlfs::{Credentials, FileSystemOps, SqlFs, ROOT_INO};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fs = SqlFs::sqlite("fs.db").await?;
//!     let creds = Credentials::default();
//!
//!     let dir = fs.mkdir(&creds, ROOT_INO, "docs", 0o755).await?;
//!     let file = fs.create(&creds, dir.ino, "hello.txt", 0o644).await?;
//!     fs.write(file.ino, 0, b"hello").await?;
//!     assert_eq!(fs.read(file.ino, 0, 5).await?, b"hello");
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod content;
pub mod error;
pub mod fs;
pub mod node;
pub mod ops;
pub mod schema;
pub mod tree;
pub mod txn;

pub use backend::{SqlBackend, SqlBackendConfig};
pub use error::{Errno, FsError, FsResult, Result};
pub use fs::SqlFs;
pub use node::{DeviceClass, FileType, InodeId, Node, NodeKind};
pub use ops::{Credentials, DirEntry, FileAttr, FileSystemOps, SetAttributes, SetTime, StatFs};
pub use schema::{BLOCK_SIZE, MAX_FILE_SIZE, ROOT_INO};
