//! Chunked file content over the `data_blocks` relation
//!
//! Content is always handled whole: a read concatenates every block of the
//! inode, and a write replaces the full block set. Partial windows are the
//! dispatcher's job (read-modify-write on the full buffer).

use crate::error::Result;
use crate::node::{InodeId, Node, NodeRepository};
use crate::schema::BLOCK_SIZE;
use sqlx::AnyConnection;

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStore {
    nodes: NodeRepository,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full content of `inode`; empty when it has no blocks.
    pub async fn read(&self, conn: &mut AnyConnection, inode: InodeId) -> Result<Vec<u8>> {
        let blocks: Vec<Vec<u8>> =
            sqlx::query_scalar("SELECT data FROM data_blocks WHERE inode = $1 ORDER BY sequence")
                .bind(inode)
                .fetch_all(&mut *conn)
                .await?;

        Ok(blocks.concat())
    }

    /// Replace the content of `inode` with `data` and record its new size.
    /// Returns the updated node.
    pub async fn write(
        &self,
        conn: &mut AnyConnection,
        inode: InodeId,
        data: &[u8],
    ) -> Result<Node> {
        let mut node = self.nodes.get(conn, inode).await?;
        node.set_size(inode, data.len() as u64)?;

        sqlx::query("DELETE FROM data_blocks WHERE inode = $1")
            .bind(inode)
            .execute(&mut *conn)
            .await?;

        for (idx, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            sqlx::query("INSERT INTO data_blocks (inode, sequence, data) VALUES ($1, $2, $3)")
                .bind(inode)
                .bind(idx as i64 + 1)
                .bind(chunk.to_vec())
                .execute(&mut *conn)
                .await?;
        }

        node.touch_mtime();
        self.nodes.put(conn, inode, &node).await?;

        tracing::debug!(inode, len = data.len(), "wrote content");
        Ok(node)
    }
}
