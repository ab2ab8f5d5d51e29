//! Live connection handles.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dbkit_common::{DataError, DataResult, DriverKind, ResolvedConfiguration};
use sqlx::{MySqlPool, PgPool, SqlitePool};
use uuid::Uuid;

/// Connection pool wrapper for the supported database types.
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

impl DatabasePool {
    pub fn is_closed(&self) -> bool {
        match self {
            DatabasePool::MySQL(p) => p.is_closed(),
            DatabasePool::Postgres(p) => p.is_closed(),
            DatabasePool::SQLite(p) => p.is_closed(),
        }
    }

    async fn close(&self) {
        match self {
            DatabasePool::MySQL(p) => p.close().await,
            DatabasePool::Postgres(p) => p.close().await,
            DatabasePool::SQLite(p) => p.close().await,
        }
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of active (in-use) connections.
    pub active: u32,
    /// Number of idle connections.
    pub idle: u32,
    /// Whether the pool is still open.
    pub is_connected: bool,
}

/// A live connection to one database.
///
/// Created by [`ConnectionAdapter::connect`](crate::ConnectionAdapter::connect)
/// and owned by the manager built from it. [`disconnect`](Self::disconnect)
/// closes the underlying pool and may be called any number of times.
pub struct ConnectionHandle {
    id: Uuid,
    config: ResolvedConfiguration,
    pool: DatabasePool,
    connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    pub(crate) fn new(config: ResolvedConfiguration, pool: DatabasePool) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            pool,
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.config.driver_kind
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// The connection URL with the password masked.
    pub fn describe(&self) -> String {
        self.config.redacted_url()
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub fn is_connected(&self) -> bool {
        !self.pool.is_closed()
    }

    pub(crate) fn ensure_open(&self) -> DataResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DataError::Connection(format!(
                "connection handle {} is closed",
                self.id
            )))
        }
    }

    /// Runs `SELECT 1` and returns the round-trip latency.
    pub async fn ping(&self) -> DataResult<Duration> {
        self.ensure_open()?;
        let start = Instant::now();

        match &self.pool {
            DatabasePool::MySQL(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(|e| DataError::Connection(e.to_string()))?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(|e| DataError::Connection(e.to_string()))?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(|e| DataError::Connection(e.to_string()))?;
            }
        }

        Ok(start.elapsed())
    }

    pub fn pool_stats(&self) -> PoolStats {
        let (size, idle) = match &self.pool {
            DatabasePool::MySQL(p) => (p.size(), p.num_idle() as u32),
            DatabasePool::Postgres(p) => (p.size(), p.num_idle() as u32),
            DatabasePool::SQLite(p) => (p.size(), p.num_idle() as u32),
        };
        PoolStats {
            active: size.saturating_sub(idle),
            idle,
            is_connected: self.is_connected(),
        }
    }

    /// Closes the pool. Calling this on a closed handle is a no-op.
    pub async fn disconnect(&self) {
        if self.pool.is_closed() {
            tracing::debug!(handle = %self.id, "disconnect on closed handle ignored");
            return;
        }
        self.pool.close().await;
        tracing::info!(handle = %self.id, url = %self.describe(), "disconnected");
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("url", &self.describe())
            .field("connected_at", &self.connected_at)
            .field("connected", &self.is_connected())
            .finish()
    }
}
