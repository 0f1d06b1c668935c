//! Inode metadata and the repository that persists it
//!
//! A [`Node`] is stored as a JSON document in `inodes.struct_data`, keyed by
//! inode number. The repository performs no validation beyond
//! serialization; callers keep link counts and tree entries consistent.

use crate::error::{FsError, Result};
use crate::schema::mode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::AnyConnection;

pub type InodeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Char,
    Block,
}

/// What a node is, with the fields only that kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    RegularFile { size: u64 },
    Symlink { target: String },
    Device { class: DeviceClass, rdev: u32 },
    Fifo,
    Socket,
}

impl NodeKind {
    /// Derive a kind from the type bits of a `st_mode` value. Missing type
    /// bits mean a regular file, as with `mknod(2)`.
    pub fn from_mode(st_mode: u32, rdev: u32) -> Result<Self> {
        match st_mode & mode::S_IFMT {
            0 | mode::S_IFREG => Ok(NodeKind::RegularFile { size: 0 }),
            mode::S_IFDIR => Ok(NodeKind::Directory),
            mode::S_IFCHR => Ok(NodeKind::Device {
                class: DeviceClass::Char,
                rdev,
            }),
            mode::S_IFBLK => Ok(NodeKind::Device {
                class: DeviceClass::Block,
                rdev,
            }),
            mode::S_IFIFO => Ok(NodeKind::Fifo),
            mode::S_IFSOCK => Ok(NodeKind::Socket),
            mode::S_IFLNK => Err(FsError::InvalidArgument(
                "symlinks are created with symlink, not mknod".to_string(),
            )),
            other => Err(FsError::InvalidArgument(format!(
                "unknown file type bits {:o}",
                other
            ))),
        }
    }

    fn type_bits(&self) -> u32 {
        match self {
            NodeKind::Directory => mode::S_IFDIR,
            NodeKind::RegularFile { .. } => mode::S_IFREG,
            NodeKind::Symlink { .. } => mode::S_IFLNK,
            NodeKind::Device {
                class: DeviceClass::Char,
                ..
            } => mode::S_IFCHR,
            NodeKind::Device {
                class: DeviceClass::Block,
                ..
            } => mode::S_IFBLK,
            NodeKind::Fifo => mode::S_IFIFO,
            NodeKind::Socket => mode::S_IFSOCK,
        }
    }

    /// Link count of a freshly created node: a directory counts its own `.`
    /// and the parent's entry.
    pub fn initial_nlink(&self) -> u32 {
        match self {
            NodeKind::Directory => 2,
            _ => 1,
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            NodeKind::Directory => FileType::Directory,
            NodeKind::RegularFile { .. } => FileType::RegularFile,
            NodeKind::Symlink { .. } => FileType::Symlink,
            NodeKind::Device {
                class: DeviceClass::Char,
                ..
            } => FileType::CharDevice,
            NodeKind::Device {
                class: DeviceClass::Block,
                ..
            } => FileType::BlockDevice,
            NodeKind::Fifo => FileType::NamedPipe,
            NodeKind::Socket => FileType::Socket,
        }
    }
}

/// Directory-entry type reported to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    NamedPipe,
    CharDevice,
    BlockDevice,
    Directory,
    RegularFile,
    Symlink,
    Socket,
}

/// One inode's metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Permission bits only; the type bits come from `kind`.
    pub perm: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub flags: u32,
    pub atime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub crtime: DateTime<Utc>,
}

impl Node {
    pub fn new(kind: NodeKind, perm: u32, uid: u32, gid: u32) -> Self {
        let now = Utc::now();
        Self {
            nlink: kind.initial_nlink(),
            kind,
            perm: perm & mode::PERM_MASK,
            uid,
            gid,
            flags: 0,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
        }
    }

    pub fn root() -> Self {
        Self::new(NodeKind::Directory, mode::DEFAULT_DIR_PERM, 0, 0)
    }

    /// Full `st_mode`: type bits plus permission bits.
    pub fn mode(&self) -> u32 {
        self.kind.type_bits() | self.perm
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Byte size as reported by `stat`.
    pub fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::RegularFile { size } => *size,
            NodeKind::Symlink { target } => target.len() as u64,
            _ => 0,
        }
    }

    pub fn rdev(&self) -> u32 {
        match self.kind {
            NodeKind::Device { rdev, .. } => rdev,
            _ => 0,
        }
    }

    /// Record a new content length. Only regular files carry content.
    pub fn set_size(&mut self, inode: InodeId, new_size: u64) -> Result<()> {
        match &mut self.kind {
            NodeKind::RegularFile { size } => {
                *size = new_size;
                Ok(())
            }
            _ => Err(FsError::type_mismatch(inode, "regular file")),
        }
    }

    pub fn touch_ctime(&mut self) {
        self.ctime = Utc::now();
    }

    pub fn touch_mtime(&mut self) {
        let now = Utc::now();
        self.mtime = now;
        self.ctime = now;
    }

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Get/put access to single inode records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeRepository;

impl NodeRepository {
    pub async fn get(&self, conn: &mut AnyConnection, inode: InodeId) -> Result<Node> {
        let data: Option<String> =
            sqlx::query_scalar("SELECT struct_data FROM inodes WHERE inode = $1")
                .bind(inode)
                .fetch_optional(&mut *conn)
                .await?;

        match data {
            Some(data) => Node::from_json(&data),
            None => Err(FsError::NotFound(format!("inode {}", inode))),
        }
    }

    /// Insert or overwrite the record for `inode`.
    pub async fn put(&self, conn: &mut AnyConnection, inode: InodeId, node: &Node) -> Result<()> {
        sqlx::query(
            "INSERT INTO inodes (inode, struct_data) VALUES ($1, $2) \
             ON CONFLICT (inode) DO UPDATE SET struct_data = excluded.struct_data",
        )
        .bind(inode)
        .bind(node.to_json()?)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Insert the record only if no record for `inode` exists yet.
    pub(crate) async fn insert_if_absent(
        &self,
        conn: &mut AnyConnection,
        inode: InodeId,
        node: &Node,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO inodes (inode, struct_data) VALUES ($1, $2) ON CONFLICT (inode) DO NOTHING",
        )
        .bind(inode)
        .bind(node.to_json()?)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, conn: &mut AnyConnection, inode: InodeId) -> Result<()> {
        sqlx::query("DELETE FROM inodes WHERE inode = $1")
            .bind(inode)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
