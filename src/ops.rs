//! POSIX-shaped operation surface
//!
//! [`FileSystemOps`] is what a kernel bridge (FUSE or otherwise) drives.
//! Every call is a self-contained request/response: there is no open-file
//! state, reads and writes address the inode directly.

use crate::error::FsResult;
use crate::node::{FileType, InodeId, Node};
use crate::schema::BLOCK_SIZE;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Identity of the caller, used for ownership of new nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

/// Attributes reported for a node, shaped like `struct stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttr {
    pub ino: InodeId,
    pub size: u64,
    /// Size in 512-byte units
    pub blocks: u64,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub crtime: DateTime<Utc>,
    pub kind: FileType,
    /// Permission bits
    pub perm: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub flags: u32,
    pub blksize: u32,
}

impl FileAttr {
    pub fn new(ino: InodeId, node: &Node) -> Self {
        let size = node.size();
        Self {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: node.atime,
            mtime: node.mtime,
            ctime: node.ctime,
            crtime: node.crtime,
            kind: node.kind.file_type(),
            perm: node.perm,
            nlink: node.nlink,
            uid: node.uid,
            gid: node.gid,
            rdev: node.rdev(),
            flags: node.flags,
            blksize: BLOCK_SIZE as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: InodeId,
    pub name: String,
    pub kind: FileType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTime {
    Now,
    At(DateTime<Utc>),
}

impl SetTime {
    pub(crate) fn resolve(self) -> DateTime<Utc> {
        match self {
            SetTime::Now => Utc::now(),
            SetTime::At(at) => at,
        }
    }
}

/// Attribute changes for `setattr`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetAttributes {
    /// Permission bits; type bits in the value are ignored.
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// Truncate or zero-extend a regular file.
    pub size: Option<u64>,
    pub atime: Option<SetTime>,
    pub mtime: Option<SetTime>,
    pub crtime: Option<DateTime<Utc>>,
    pub flags: Option<u32>,
}

/// Filesystem statistics. Free counts are not tracked and stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u32,
    pub fragment_size: u32,
    /// Number of stored data blocks
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    /// Number of stored inodes
    pub files: u64,
    pub files_free: u64,
    pub name_max: u32,
}

#[async_trait]
pub trait FileSystemOps: Send + Sync {
    async fn lookup(&self, parent: InodeId, name: &str) -> FsResult<FileAttr>;

    async fn getattr(&self, ino: InodeId) -> FsResult<FileAttr>;

    async fn setattr(&self, ino: InodeId, attrs: &SetAttributes) -> FsResult<FileAttr>;

    async fn create(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr>;

    async fn mkdir(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr>;

    /// Create a regular file, device, fifo or socket; the kind comes from
    /// the type bits of `mode`.
    async fn mknod(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
        rdev: u32,
    ) -> FsResult<FileAttr>;

    async fn symlink(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        target: &str,
    ) -> FsResult<FileAttr>;

    async fn readlink(&self, ino: InodeId) -> FsResult<String>;

    async fn link(&self, ino: InodeId, new_parent: InodeId, new_name: &str) -> FsResult<FileAttr>;

    async fn rename(
        &self,
        parent: InodeId,
        name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> FsResult<()>;

    async fn unlink(&self, parent: InodeId, name: &str) -> FsResult<()>;

    async fn rmdir(&self, parent: InodeId, name: &str) -> FsResult<()>;

    async fn read(&self, ino: InodeId, offset: u64, size: u32) -> FsResult<Vec<u8>>;

    /// Write `data` at `offset`, returning the number of bytes written.
    async fn write(&self, ino: InodeId, offset: u64, data: &[u8]) -> FsResult<u32>;

    async fn readdir(&self, ino: InodeId) -> FsResult<Vec<DirEntry>>;

    async fn statfs(&self) -> FsResult<StatFs>;

    async fn fsync(&self, ino: InodeId) -> FsResult<()>;
}
