//! Backing store handle for SQLFS
//!
//! Owns the SQLx connection pool for the lifetime of the filesystem and is
//! passed explicitly to every component. Supports SQLite and PostgreSQL
//! (including wire-compatible engines such as CockroachDB) through the
//! `Any` driver, with runtime dispatch based on the configuration.

use crate::{error::Result, FsError};
use sqlx::{
    any::install_default_drivers,
    pool::{PoolConnection, PoolOptions},
    Any, AnyConnection, AnyPool,
};

/// Configuration for the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlBackendConfig {
    /// SQLite: file path or ":memory:"
    #[cfg(feature = "sqlite")]
    Sqlite(String),

    /// PostgreSQL: connection URL
    #[cfg(feature = "postgres")]
    Postgres(String),
}

impl SqlBackendConfig {
    /// Parse a connection URL into a backend configuration.
    ///
    /// Accepts `sqlite:<path>` (or `sqlite::memory:`) and
    /// `postgres://` / `postgresql://` URLs.
    pub fn from_url(url: &str) -> Result<Self> {
        #[cfg(feature = "sqlite")]
        if let Some(path) = url.strip_prefix("sqlite:") {
            let path = path.trim_start_matches("//");
            if path.is_empty() {
                return Err(FsError::Connection("empty sqlite path".to_string()));
            }
            return Ok(SqlBackendConfig::Sqlite(path.to_string()));
        }

        #[cfg(feature = "postgres")]
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(SqlBackendConfig::Postgres(url.to_string()));
        }

        Err(FsError::Connection(format!(
            "unsupported connection url: {}",
            url
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendType {
    #[cfg(feature = "sqlite")]
    Sqlite,
    #[cfg(feature = "postgres")]
    Postgres,
}

/// Connection pool plus the dialect knowledge the components need
#[derive(Clone)]
pub struct SqlBackend {
    pool: AnyPool,
    backend_type: BackendType,
}

impl SqlBackend {
    /// Open the store and bring its schema up to date.
    ///
    /// # Arguments
    ///
    /// * `config` - Backend configuration (SQLite path or Postgres URL)
    pub async fn new(config: SqlBackendConfig) -> Result<Self> {
        install_default_drivers();

        let (url, backend_type, is_memory) = match config {
            #[cfg(feature = "sqlite")]
            SqlBackendConfig::Sqlite(path) => {
                let is_memory = path == ":memory:";
                let url = if is_memory {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite:{}?mode=rwc", path)
                };
                (url, BackendType::Sqlite, is_memory)
            }
            #[cfg(feature = "postgres")]
            SqlBackendConfig::Postgres(url) => (url, BackendType::Postgres, false),
        };

        // An in-memory database lives exactly as long as its one connection,
        // so that connection must never be reaped.
        let pool = if is_memory {
            PoolOptions::<Any>::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&url)
                .await
                .map_err(|e| FsError::Connection(e.to_string()))?
        } else {
            AnyPool::connect(&url)
                .await
                .map_err(|e| FsError::Connection(e.to_string()))?
        };

        let backend = Self { pool, backend_type };
        backend.migrate().await?;
        tracing::debug!(backend = ?backend.backend_type, "store ready");

        Ok(backend)
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

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        let sql = match self.backend_type {
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => include_str!("../migrations/sqlite.sql"),
            #[cfg(feature = "postgres")]
            BackendType::Postgres => include_str!("../migrations/postgres.sql"),
        };

        // DDL runs outside a transaction; SQLite auto-commits it anyway.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| FsError::Migration(format!("Failed to acquire connection: {}", e)))?;

        for (idx, statement) in split_statements(sql).into_iter().enumerate() {
            sqlx::query(&statement)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    FsError::Migration(format!(
                        "Failed to execute migration statement #{}: {} - Error: {}",
                        idx, statement, e
                    ))
                })?;
        }

        Ok(())
    }

    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub(crate) fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    /// Check out a connection for a sequence of read statements.
    pub(crate) async fn acquire(&self) -> Result<PoolConnection<Any>> {
        Ok(self.pool.acquire().await?)
    }

    /// Draw the next inode number from the store's sequence.
    pub(crate) async fn next_inode(&self, conn: &mut AnyConnection) -> Result<i64> {
        match self.backend_type {
            #[cfg(feature = "sqlite")]
            BackendType::Sqlite => {
                let next: i64 = sqlx::query_scalar(
                    "UPDATE inode_sequence SET next_inode = next_inode + 1 WHERE id = 1 RETURNING next_inode",
                )
                .fetch_one(&mut *conn)
                .await?;
                Ok(next - 1)
            }
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                let next: i64 = sqlx::query_scalar("SELECT nextval('inode_seq')")
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(next)
            }
        }
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Split a migration script into executable statements, dropping comment
/// lines and blanks. SQLx does not run multi-statement strings.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| {
                    let trimmed = line.trim();
                    !trimmed.is_empty() && !trimmed.starts_with("--")
                })
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
