//! SQL-backed implementation of [`FileSystemOps`]
//!
//! Mutations run inside one serializable transaction each; lookups,
//! listings and attribute reads go straight to a pooled connection.
//! Internal outcomes become [`Errno`](crate::Errno) codes only at this layer.

use crate::backend::{SqlBackend, SqlBackendConfig};
use crate::content::ContentStore;
use crate::error::{FsError, FsResult, Result};
use crate::node::{InodeId, Node, NodeKind, NodeRepository};
use crate::ops::{Credentials, DirEntry, FileAttr, FileSystemOps, SetAttributes, StatFs};
use crate::schema::{mode, BLOCK_SIZE, MAX_FILE_SIZE, NAME_MAX, ROOT_INO};
use crate::tree::TreeResolver;
use crate::txn::Coordinator;
use async_trait::async_trait;
use sqlx::AnyConnection;
use tracing::debug;

/// The filesystem engine. Cheap to clone; every clone shares one pool.
#[derive(Clone)]
pub struct SqlFs {
    backend: SqlBackend,
    coordinator: Coordinator,
    tree: TreeResolver,
    nodes: NodeRepository,
    content: ContentStore,
}

impl SqlFs {
    /// Open the store described by `config` and make sure the root
    /// directory record exists.
    pub async fn new(config: SqlBackendConfig) -> Result<Self> {
        let backend = SqlBackend::new(config).await?;
        Self::with_backend(backend).await
    }

    /// Convenience constructor for SQLite
    #[cfg(feature = "sqlite")]
    pub async fn sqlite(path: impl Into<String>) -> Result<Self> {
        Self::new(SqlBackendConfig::Sqlite(path.into())).await
    }

    /// Convenience constructor for PostgreSQL
    #[cfg(feature = "postgres")]
    pub async fn postgres(url: impl Into<String>) -> Result<Self> {
        Self::new(SqlBackendConfig::Postgres(url.into())).await
    }

    pub async fn with_backend(backend: SqlBackend) -> Result<Self> {
        let nodes = NodeRepository;
        let mut conn = backend.acquire().await?;
        nodes
            .insert_if_absent(&mut conn, ROOT_INO, &Node::root())
            .await?;
        drop(conn);

        Ok(Self {
            coordinator: Coordinator::new(backend.clone()),
            tree: TreeResolver::new(backend.clone()),
            nodes,
            content: ContentStore::new(),
            backend,
        })
    }

    pub fn backend(&self) -> &SqlBackend {
        &self.backend
    }

    async fn require_directory(&self, conn: &mut AnyConnection, ino: InodeId) -> Result<Node> {
        let node = self.nodes.get(conn, ino).await?;
        if !node.is_dir() {
            return Err(FsError::type_mismatch(ino, "directory"));
        }
        Ok(node)
    }

    async fn require_file(&self, conn: &mut AnyConnection, ino: InodeId) -> Result<Node> {
        let node = self.nodes.get(conn, ino).await?;
        match node.kind {
            NodeKind::RegularFile { .. } => Ok(node),
            _ => Err(FsError::type_mismatch(ino, "regular file")),
        }
    }

    /// Create `node` as `parent/name` in one transaction.
    async fn insert_node(&self, parent: InodeId, name: &str, node: Node) -> Result<FileAttr> {
        validate_name(name)?;

        let mut tx = self.coordinator.begin().await?;
        self.require_directory(&mut tx, parent).await?;
        let (ino, node) = self.tree.insert(&mut tx, parent, name, node).await?;
        self.coordinator.commit(tx).await?;

        Ok(FileAttr::new(ino, &node))
    }

    /// Reject moving directory `dir` underneath itself.
    async fn check_not_ancestor(
        &self,
        conn: &mut AnyConnection,
        dir: InodeId,
        new_parent: InodeId,
    ) -> Result<()> {
        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == dir {
                return Err(FsError::InvalidArgument(format!(
                    "cannot move directory {} beneath itself",
                    dir
                )));
            }
            cursor = self.tree.parent_of(conn, current).await?;
        }
        Ok(())
    }

    /// Remove `parent/name`, requiring the target to be (or not be) a
    /// directory.
    async fn remove_entry(&self, parent: InodeId, name: &str, want_dir: bool) -> Result<()> {
        let mut tx = self.coordinator.begin().await?;
        self.require_directory(&mut tx, parent).await?;

        let ino = self.tree.resolve(&mut tx, parent, name).await?;
        let node = self.nodes.get(&mut tx, ino).await?;
        match (want_dir, node.is_dir()) {
            (true, false) => return Err(FsError::type_mismatch(ino, "directory")),
            (false, true) => return Err(FsError::type_mismatch(ino, "non-directory")),
            _ => {}
        }

        self.tree.remove(&mut tx, parent, name).await?;
        self.coordinator.commit(tx).await
    }
}

/// Names are single path components.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidArgument(format!("invalid name {:?}", name)));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidArgument(format!(
            "name {:?} contains a separator",
            name
        )));
    }
    if name.len() > NAME_MAX {
        return Err(FsError::InvalidArgument(format!(
            "name is {} bytes, limit is {}",
            name.len(),
            NAME_MAX
        )));
    }
    Ok(())
}

/// Check a prospective file length against [`MAX_FILE_SIZE`].
fn file_len(value: u64) -> Result<usize> {
    if value > MAX_FILE_SIZE {
        return Err(FsError::InvalidArgument(format!(
            "file size {} exceeds limit {}",
            value, MAX_FILE_SIZE
        )));
    }
    usize::try_from(value)
        .map_err(|_| FsError::InvalidArgument(format!("{} exceeds addressable size", value)))
}

#[async_trait]
impl FileSystemOps for SqlFs {
    async fn lookup(&self, parent: InodeId, name: &str) -> FsResult<FileAttr> {
        debug!(parent, name, "lookup");
        let result: Result<FileAttr> = async {
            let mut conn = self.backend.acquire().await?;
            self.require_directory(&mut conn, parent).await?;
            let ino = self.tree.resolve(&mut conn, parent, name).await?;
            let node = self.nodes.get(&mut conn, ino).await?;
            Ok(FileAttr::new(ino, &node))
        }
        .await;
        Ok(result?)
    }

    async fn getattr(&self, ino: InodeId) -> FsResult<FileAttr> {
        debug!(ino, "getattr");
        let result: Result<FileAttr> = async {
            let mut conn = self.backend.acquire().await?;
            let node = self.nodes.get(&mut conn, ino).await?;
            Ok(FileAttr::new(ino, &node))
        }
        .await;
        Ok(result?)
    }

    async fn setattr(&self, ino: InodeId, attrs: &SetAttributes) -> FsResult<FileAttr> {
        debug!(ino, ?attrs, "setattr");
        let result: Result<FileAttr> = async {
            let mut tx = self.coordinator.begin().await?;
            let mut node = self.nodes.get(&mut tx, ino).await?;

            if let Some(size) = attrs.size {
                let size = file_len(size)?;
                self.require_file(&mut tx, ino).await?;
                let mut data = self.content.read(&mut tx, ino).await?;
                data.resize(size, 0);
                node = self.content.write(&mut tx, ino, &data).await?;
            }

            if let Some(perm) = attrs.mode {
                node.perm = perm & mode::PERM_MASK;
            }
            if let Some(uid) = attrs.uid {
                node.uid = uid;
            }
            if let Some(gid) = attrs.gid {
                node.gid = gid;
            }
            if let Some(atime) = attrs.atime {
                node.atime = atime.resolve();
            }
            if let Some(mtime) = attrs.mtime {
                node.mtime = mtime.resolve();
            }
            if let Some(crtime) = attrs.crtime {
                node.crtime = crtime;
            }
            if let Some(flags) = attrs.flags {
                node.flags = flags;
            }
            node.touch_ctime();

            self.nodes.put(&mut tx, ino, &node).await?;
            self.coordinator.commit(tx).await?;
            Ok(FileAttr::new(ino, &node))
        }
        .await;
        Ok(result?)
    }

    async fn create(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr> {
        debug!(parent, name, mode, "create");
        let node = Node::new(NodeKind::RegularFile { size: 0 }, mode, creds.uid, creds.gid);
        Ok(self.insert_node(parent, name, node).await?)
    }

    async fn mkdir(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
    ) -> FsResult<FileAttr> {
        debug!(parent, name, mode, "mkdir");
        let node = Node::new(NodeKind::Directory, mode, creds.uid, creds.gid);
        Ok(self.insert_node(parent, name, node).await?)
    }

    async fn mknod(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        mode: u32,
        rdev: u32,
    ) -> FsResult<FileAttr> {
        debug!(parent, name, mode, rdev, "mknod");
        let result: Result<FileAttr> = async {
            let kind = NodeKind::from_mode(mode, rdev)?;
            let node = Node::new(kind, mode, creds.uid, creds.gid);
            self.insert_node(parent, name, node).await
        }
        .await;
        Ok(result?)
    }

    async fn symlink(
        &self,
        creds: &Credentials,
        parent: InodeId,
        name: &str,
        target: &str,
    ) -> FsResult<FileAttr> {
        debug!(parent, name, link_target = target, "symlink");
        let kind = NodeKind::Symlink {
            target: target.to_string(),
        };
        let node = Node::new(kind, mode::SYMLINK_PERM, creds.uid, creds.gid);
        Ok(self.insert_node(parent, name, node).await?)
    }

    async fn readlink(&self, ino: InodeId) -> FsResult<String> {
        debug!(ino, "readlink");
        let result: Result<String> = async {
            let mut conn = self.backend.acquire().await?;
            match self.nodes.get(&mut conn, ino).await?.kind {
                NodeKind::Symlink { target } => Ok(target),
                _ => Err(FsError::type_mismatch(ino, "symlink")),
            }
        }
        .await;
        Ok(result?)
    }

    async fn link(&self, ino: InodeId, new_parent: InodeId, new_name: &str) -> FsResult<FileAttr> {
        debug!(ino, new_parent, new_name, "link");
        let result: Result<FileAttr> = async {
            validate_name(new_name)?;
            let mut tx = self.coordinator.begin().await?;
            self.require_directory(&mut tx, new_parent).await?;
            let node = self.tree.link(&mut tx, new_parent, new_name, ino).await?;
            self.coordinator.commit(tx).await?;
            Ok(FileAttr::new(ino, &node))
        }
        .await;
        Ok(result?)
    }

    async fn rename(
        &self,
        parent: InodeId,
        name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> FsResult<()> {
        debug!(parent, name, new_parent, new_name, "rename");
        let result: Result<()> = async {
            validate_name(new_name)?;
            let mut tx = self.coordinator.begin().await?;
            self.require_directory(&mut tx, parent).await?;
            self.require_directory(&mut tx, new_parent).await?;

            let src = self.tree.resolve(&mut tx, parent, name).await?;
            let mut src_node = self.nodes.get(&mut tx, src).await?;
            if src_node.is_dir() {
                self.check_not_ancestor(&mut tx, src, new_parent).await?;
            }

            // An existing destination is replaced atomically.
            match self.tree.resolve(&mut tx, new_parent, new_name).await {
                Ok(dst) if dst == src => return self.coordinator.commit(tx).await,
                Ok(dst) => {
                    let dst_node = self.nodes.get(&mut tx, dst).await?;
                    match (src_node.is_dir(), dst_node.is_dir()) {
                        (true, false) => return Err(FsError::type_mismatch(dst, "directory")),
                        (false, true) => {
                            return Err(FsError::type_mismatch(dst, "non-directory"));
                        }
                        _ => {}
                    }
                    self.tree.remove(&mut tx, new_parent, new_name).await?;
                }
                Err(FsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            self.tree
                .rename(&mut tx, parent, name, new_parent, new_name)
                .await?;
            src_node.touch_ctime();
            self.nodes.put(&mut tx, src, &src_node).await?;
            self.coordinator.commit(tx).await
        }
        .await;
        Ok(result?)
    }

    async fn unlink(&self, parent: InodeId, name: &str) -> FsResult<()> {
        debug!(parent, name, "unlink");
        Ok(self.remove_entry(parent, name, false).await?)
    }

    async fn rmdir(&self, parent: InodeId, name: &str) -> FsResult<()> {
        debug!(parent, name, "rmdir");
        Ok(self.remove_entry(parent, name, true).await?)
    }

    async fn read(&self, ino: InodeId, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        debug!(ino, offset, size, "read");
        let result: Result<Vec<u8>> = async {
            let mut conn = self.backend.acquire().await?;
            self.require_file(&mut conn, ino).await?;
            let data = self.content.read(&mut conn, ino).await?;

            let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
            let end = start.saturating_add(size as usize).min(data.len());
            Ok(data[start..end].to_vec())
        }
        .await;
        Ok(result?)
    }

    async fn write(&self, ino: InodeId, offset: u64, data: &[u8]) -> FsResult<u32> {
        debug!(ino, offset, len = data.len(), "write");
        let result: Result<u32> = async {
            let written = u32::try_from(data.len())
                .map_err(|_| FsError::InvalidArgument("write larger than 4 GiB".to_string()))?;
            if data.is_empty() {
                let mut conn = self.backend.acquire().await?;
                self.require_file(&mut conn, ino).await?;
                return Ok(0);
            }
            let end = offset
                .checked_add(data.len() as u64)
                .ok_or_else(|| FsError::InvalidArgument("write past addressable size".to_string()))?;
            let end = file_len(end)?;
            let start = end - data.len();

            let mut tx = self.coordinator.begin().await?;
            self.require_file(&mut tx, ino).await?;

            let mut buf = self.content.read(&mut tx, ino).await?;
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[start..end].copy_from_slice(data);

            self.content.write(&mut tx, ino, &buf).await?;
            self.coordinator.commit(tx).await?;
            Ok(written)
        }
        .await;
        Ok(result?)
    }

    async fn readdir(&self, ino: InodeId) -> FsResult<Vec<DirEntry>> {
        debug!(ino, "readdir");
        let result: Result<Vec<DirEntry>> = async {
            let mut conn = self.backend.acquire().await?;
            let children = self.tree.list_children(&mut conn, ino).await?;
            Ok(children
                .into_iter()
                .map(|child| DirEntry {
                    inode: child.inode,
                    name: child.name,
                    kind: child.kind,
                })
                .collect())
        }
        .await;
        Ok(result?)
    }

    async fn statfs(&self) -> FsResult<StatFs> {
        debug!("statfs");
        let result: Result<StatFs> = async {
            let mut conn = self.backend.acquire().await?;
            let blocks = self.tree.count_data_blocks(&mut conn).await?;
            let files = self.tree.count_nodes(&mut conn).await?;
            Ok(StatFs {
                block_size: BLOCK_SIZE as u32,
                fragment_size: BLOCK_SIZE as u32,
                blocks,
                files,
                name_max: NAME_MAX as u32,
                ..StatFs::default()
            })
        }
        .await;
        Ok(result?)
    }

    async fn fsync(&self, ino: InodeId) -> FsResult<()> {
        debug!(ino, "fsync");
        // Content is durable once its transaction commits.
        self.getattr(ino).await.map(|_| ())
    }
}
