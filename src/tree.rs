//! Parent/name resolution and link bookkeeping over the `tree` relation
//!
//! Every mutating method runs on the connection it is handed, which the
//! caller opens as a transaction; the resolver itself never commits.
//! The root inode is implicit: it is never a child row, and it is accepted
//! as a parent without a type check.

use crate::backend::SqlBackend;
use crate::error::{FsError, Result};
use crate::node::{FileType, InodeId, Node, NodeRepository};
use crate::schema::ROOT_INO;
use sqlx::{Any, AnyConnection};

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub inode: InodeId,
    pub name: String,
    pub kind: FileType,
}

#[derive(Clone)]
pub struct TreeResolver {
    backend: SqlBackend,
    nodes: NodeRepository,
}

impl TreeResolver {
    pub fn new(backend: SqlBackend) -> Self {
        Self {
            backend,
            nodes: NodeRepository,
        }
    }

    pub async fn resolve(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
        name: &str,
    ) -> Result<InodeId> {
        sqlx::query_scalar("SELECT inode FROM tree WHERE parent = $1 AND name = $2")
            .bind(parent)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| FsError::NotFound(format!("{} in directory {}", name, parent)))
    }

    /// List the entries under `parent`, in no particular order.
    pub async fn list_children(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
    ) -> Result<Vec<Child>> {
        if parent != ROOT_INO && !self.nodes.get(conn, parent).await?.is_dir() {
            return Err(FsError::type_mismatch(parent, "directory"));
        }

        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT tree.inode, tree.name, inodes.struct_data \
             FROM tree JOIN inodes ON tree.inode = inodes.inode \
             WHERE tree.parent = $1",
        )
        .bind(parent)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter()
            .map(|(inode, name, data)| -> Result<Child> {
                let node: Node = serde_json::from_str(&data)?;
                Ok(Child {
                    inode,
                    name,
                    kind: node.kind.file_type(),
                })
            })
            .collect()
    }

    /// Allocate an inode for `node`, link it under `parent` as `name`, and
    /// persist it with the link count its kind starts with.
    pub async fn insert(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
        name: &str,
        mut node: Node,
    ) -> Result<(InodeId, Node)> {
        let inode = self.backend.next_inode(conn).await?;
        self.insert_entry(conn, parent, name, inode).await?;

        node.nlink = node.kind.initial_nlink();
        self.nodes.put(conn, inode, &node).await?;

        tracing::debug!(parent, name, inode, "inserted node");
        Ok((inode, node))
    }

    /// Add a hard link `parent/name` to an existing non-directory inode.
    pub async fn link(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
        name: &str,
        inode: InodeId,
    ) -> Result<Node> {
        let mut node = self.nodes.get(conn, inode).await?;
        if node.is_dir() {
            return Err(FsError::type_mismatch(inode, "non-directory"));
        }

        self.insert_entry(conn, parent, name, inode).await?;

        node.nlink += 1;
        node.touch_ctime();
        self.nodes.put(conn, inode, &node).await?;
        Ok(node)
    }

    /// Move the entry `old_parent/old_name` to `new_parent/new_name` in
    /// place. The destination slot must already be free.
    pub async fn rename(
        &self,
        conn: &mut AnyConnection,
        old_parent: InodeId,
        old_name: &str,
        new_parent: InodeId,
        new_name: &str,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE tree SET parent = $1, name = $2 WHERE parent = $3 AND name = $4")
                .bind(new_parent)
                .bind(new_name)
                .bind(old_parent)
                .bind(old_name)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    FsError::from_insert(e, format!("{} in directory {}", new_name, new_parent))
                })?;

        if result.rows_affected() == 0 {
            return Err(FsError::NotFound(format!(
                "{} in directory {}",
                old_name, old_parent
            )));
        }
        Ok(())
    }

    /// Drop the entry `parent/name`. When it was the last reference, the
    /// node row and its data blocks go with it; otherwise the surviving
    /// node loses one link. Returns the inode the entry pointed at.
    pub async fn remove(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
        name: &str,
    ) -> Result<InodeId> {
        let inode = self.resolve(conn, parent, name).await?;
        let mut node = self.nodes.get(conn, inode).await?;

        if node.is_dir() && self.count_children(conn, inode).await? > 0 {
            return Err(FsError::DirectoryNotEmpty(inode));
        }

        sqlx::query("DELETE FROM tree WHERE parent = $1 AND name = $2")
            .bind(parent)
            .bind(name)
            .execute(&mut *conn)
            .await?;

        if self.references(conn, inode).await? > 0 {
            node.nlink = node.nlink.saturating_sub(1);
            node.touch_ctime();
            self.nodes.put(conn, inode, &node).await?;
            return Ok(inode);
        }

        self.nodes.delete(conn, inode).await?;
        sqlx::query("DELETE FROM data_blocks WHERE inode = $1")
            .bind(inode)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(parent, name, inode, "purged node");
        Ok(inode)
    }

    /// Parent of a directory, found through its single incoming entry.
    /// `None` for the root or a node with no entry.
    pub async fn parent_of(
        &self,
        conn: &mut AnyConnection,
        inode: InodeId,
    ) -> Result<Option<InodeId>> {
        if inode == ROOT_INO {
            return Ok(None);
        }
        let parent = sqlx::query_scalar("SELECT parent FROM tree WHERE inode = $1 LIMIT 1")
            .bind(inode)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(parent)
    }

    pub async fn count_children(&self, conn: &mut AnyConnection, inode: InodeId) -> Result<u64> {
        count(conn, "SELECT COUNT(*) FROM tree WHERE parent = $1", Some(inode)).await
    }

    pub async fn count_nodes(&self, conn: &mut AnyConnection) -> Result<u64> {
        count(conn, "SELECT COUNT(*) FROM inodes", None).await
    }

    pub async fn count_data_blocks(&self, conn: &mut AnyConnection) -> Result<u64> {
        count(conn, "SELECT COUNT(*) FROM data_blocks", None).await
    }

    /// Number of tree entries pointing at `inode`.
    pub async fn references(&self, conn: &mut AnyConnection, inode: InodeId) -> Result<u64> {
        count(conn, "SELECT COUNT(*) FROM tree WHERE inode = $1", Some(inode)).await
    }

    async fn insert_entry(
        &self,
        conn: &mut AnyConnection,
        parent: InodeId,
        name: &str,
        inode: InodeId,
    ) -> Result<()> {
        sqlx::query("INSERT INTO tree (parent, name, inode) VALUES ($1, $2, $3)")
            .bind(parent)
            .bind(name)
            .bind(inode)
            .execute(&mut *conn)
            .await
            .map_err(|e| FsError::from_insert(e, format!("{} in directory {}", name, parent)))?;
        Ok(())
    }
}

async fn count(conn: &mut AnyConnection, query: &str, inode: Option<InodeId>) -> Result<u64> {
    let mut query = sqlx::query_scalar::<Any, i64>(query);
    if let Some(inode) = inode {
        query = query.bind(inode);
    }
    let count = query.fetch_one(&mut *conn).await?;
    Ok(count.max(0) as u64)
}
