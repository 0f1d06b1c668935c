//! Serializable transactions around multi-statement mutations
//!
//! A transaction that is dropped without [`Coordinator::commit`] rolls back,
//! so an early `?` return anywhere in a mutation discards every statement
//! it issued. Serialization conflicts are not retried here: they surface as
//! store errors and the caller decides whether to re-issue the operation.

use crate::backend::{BackendType, SqlBackend};
use crate::error::{FsError, Result};
use sqlx::{Any, Transaction};

pub type FsTransaction = Transaction<'static, Any>;

#[derive(Clone)]
pub struct Coordinator {
    backend: SqlBackend,
}

impl Coordinator {
    pub fn new(backend: SqlBackend) -> Self {
        Self { backend }
    }

    /// Open a transaction at serializable isolation.
    pub async fn begin(&self) -> Result<FsTransaction> {
        let mut tx = self.backend.pool().begin().await?;

        match self.backend.backend_type() {
            // SQLite transactions are serializable already, but begin
            // DEFERRED. Take the write lock with the first statement so a
            // competing writer waits out the busy timeout instead of failing
            // a read-to-write lock upgrade with SQLITE_BUSY.
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                sqlx::query("UPDATE inode_sequence SET next_inode = next_inode WHERE id = 1")
                    .execute(&mut *tx)
                    .await?;
            }
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                    .execute(&mut *tx)
                    .await?;
            }
        }

        Ok(tx)
    }

    pub async fn commit(&self, tx: FsTransaction) -> Result<()> {
        tx.commit().await.map_err(|e| {
            tracing::error!("transaction commit failed: {}", e);
            FsError::from(e)
        })
    }
}
