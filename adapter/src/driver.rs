//! Statement execution.
//!
//! [`Driver`] is the capability the manager issues statements through.
//! [`ConnectionHandle`] implements it for every backend by binding each
//! [`SqlValue`] with its concrete type and decoding result columns by the
//! column type the caller expects.

use std::sync::Arc;

use async_trait::async_trait;
use dbkit_common::{Column, ColumnType, DataError, DataResult, Record, SqlValue};
use serde_json::Value;
use sqlx::Row;
use tracing::debug;

use crate::dialect::Dialect;
use crate::handle::{ConnectionHandle, DatabasePool};
use crate::statement::Statement;

/// Executes statements against one open connection.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The SQL flavour statements must be written in.
    fn dialect(&self) -> Dialect;

    /// Runs one statement and returns the number of affected rows.
    async fn execute(&self, statement: &Statement) -> DataResult<u64>;

    /// Runs statements in order and returns the total affected rows.
    ///
    /// With `atomic` set, all statements run in one transaction and either
    /// all of them apply or none do. Otherwise execution stops at the first
    /// failure and earlier statements stay applied.
    async fn execute_all(&self, statements: &[Statement], atomic: bool) -> DataResult<u64>;

    /// Runs a query and decodes each row into a [`Record`] keyed by the
    /// names of `columns`.
    async fn fetch_all(&self, statement: &Statement, columns: &[Column]) -> DataResult<Vec<Record>>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self);
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn execute(&self, statement: &Statement) -> DataResult<u64> {
        (**self).execute(statement).await
    }

    async fn execute_all(&self, statements: &[Statement], atomic: bool) -> DataResult<u64> {
        (**self).execute_all(statements, atomic).await
    }

    async fn fetch_all(&self, statement: &Statement, columns: &[Column]) -> DataResult<Vec<Record>> {
        (**self).fetch_all(statement, columns).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn disconnect(&self) {
        (**self).disconnect().await
    }
}

macro_rules! on_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool {
            DatabasePool::MySQL($p) => $body,
            DatabasePool::Postgres($p) => $body,
            DatabasePool::SQLite($p) => $body,
        }
    };
}

macro_rules! bind_params {
    ($statement:expr) => {{
        let mut query = sqlx::query(&$statement.sql);
        for param in &$statement.params {
            query = match param {
                SqlValue::Null(ColumnType::Integer) => query.bind(None::<i64>),
                SqlValue::Null(ColumnType::Real) => query.bind(None::<f64>),
                SqlValue::Null(ColumnType::Text) => query.bind(None::<String>),
                SqlValue::Null(ColumnType::Boolean) => query.bind(None::<bool>),
                SqlValue::Integer(v) => query.bind(*v),
                SqlValue::Real(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
                SqlValue::Boolean(v) => query.bind(*v),
            };
        }
        query
    }};
}

macro_rules! decode_rows {
    ($rows:expr, $columns:expr) => {{
        let mut records = Vec::with_capacity($rows.len());
        for row in &$rows {
            let mut record = Record::new();
            for column in $columns {
                let name = column.name.as_str();
                let value = match column.column_type {
                    ColumnType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
                    ColumnType::Real => row.try_get::<Option<f64>, _>(name)?.map(Value::from),
                    ColumnType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::from),
                    ColumnType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::from),
                };
                record.insert(column.name.clone(), value.unwrap_or(Value::Null));
            }
            records.push(record);
        }
        records
    }};
}

#[async_trait]
impl Driver for ConnectionHandle {
    fn dialect(&self) -> Dialect {
        Dialect::from(self.driver_kind())
    }

    async fn execute(&self, statement: &Statement) -> DataResult<u64> {
        self.ensure_open()?;
        debug!(handle = %self.id(), sql = %statement.sql, params = statement.params.len(), "execute");

        let affected = on_pool!(self.pool(), pool => {
            bind_params!(statement).execute(pool).await?.rows_affected()
        });
        Ok(affected)
    }

    async fn execute_all(&self, statements: &[Statement], atomic: bool) -> DataResult<u64> {
        if statements.is_empty() {
            return Ok(0);
        }
        self.ensure_open()?;
        let total = statements.len();
        debug!(handle = %self.id(), statements = total, atomic, "execute batch");

        if !atomic {
            let mut affected = 0;
            for (i, statement) in statements.iter().enumerate() {
                affected += self
                    .execute(statement)
                    .await
                    .map_err(|e| e.with_context(format!("statement {} of {}", i + 1, total)))?;
            }
            return Ok(affected);
        }

        let affected = on_pool!(self.pool(), pool => {
            let mut tx = pool.begin().await?;
            let mut affected = 0;
            for (i, statement) in statements.iter().enumerate() {
                debug!(sql = %statement.sql, "execute in transaction");
                affected += bind_params!(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        DataError::from(e).with_context(format!(
                            "statement {} of {} (transaction rolled back)",
                            i + 1,
                            total
                        ))
                    })?
                    .rows_affected();
            }
            tx.commit().await?;
            affected
        });
        Ok(affected)
    }

    async fn fetch_all(&self, statement: &Statement, columns: &[Column]) -> DataResult<Vec<Record>> {
        self.ensure_open()?;
        debug!(handle = %self.id(), sql = %statement.sql, params = statement.params.len(), "fetch");

        let records = on_pool!(self.pool(), pool => {
            let rows = bind_params!(statement).fetch_all(pool).await?;
            decode_rows!(rows, columns)
        });
        Ok(records)
    }

    fn is_connected(&self) -> bool {
        ConnectionHandle::is_connected(self)
    }

    async fn disconnect(&self) {
        ConnectionHandle::disconnect(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionAdapter;
    use dbkit_common::config::SQLITE_MEMORY;
    use dbkit_common::{ConnectionConfiguration, DriverKind};

    async fn memory() -> ConnectionHandle {
        let config = ConnectionConfiguration::new(DriverKind::SQLite).with_name(SQLITE_MEMORY);
        ConnectionAdapter::new(config).connect().await.unwrap()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::integer("id"),
            Column::text("label").nullable(),
            Column::boolean("flag"),
            Column::real("score").nullable(),
        ]
    }

    async fn seed(handle: &ConnectionHandle) {
        handle
            .execute(&Statement::new(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT, flag BOOLEAN NOT NULL, score REAL)",
            ))
            .await
            .unwrap();
    }

    fn insert(id: i64, label: Option<&str>) -> Statement {
        Statement::with_params(
            "INSERT INTO t (id, label, flag, score) VALUES (?, ?, ?, ?)",
            vec![
                SqlValue::Integer(id),
                label
                    .map(|l| SqlValue::Text(l.to_string()))
                    .unwrap_or(SqlValue::Null(ColumnType::Text)),
                SqlValue::Boolean(id % 2 == 0),
                SqlValue::Real(id as f64 / 2.0),
            ],
        )
    }

    #[tokio::test]
    async fn test_round_trip_with_nulls() {
        let handle = memory().await;
        seed(&handle).await;
        assert_eq!(handle.execute(&insert(1, None)).await.unwrap(), 1);
        assert_eq!(handle.execute(&insert(2, Some("two"))).await.unwrap(), 1);

        let rows = handle
            .fetch_all(&Statement::new("SELECT id, label, flag, score FROM t ORDER BY id"), &columns())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::from(1));
        assert_eq!(rows[0]["label"], Value::Null);
        assert_eq!(rows[0]["flag"], Value::Bool(false));
        assert_eq!(rows[1]["label"], Value::from("two"));
        assert_eq!(rows[1]["score"], Value::from(1.0));
    }

    #[tokio::test]
    async fn test_atomic_batch_rolls_back() {
        let handle = memory().await;
        seed(&handle).await;
        let batch = vec![insert(1, None), insert(2, None), insert(1, None)];

        let err = handle.execute_all(&batch, true).await.unwrap_err();
        assert!(matches!(err, DataError::Query(ref m) if m.contains("statement 3 of 3")));

        let rows = handle
            .fetch_all(&Statement::new("SELECT id, label, flag, score FROM t"), &columns())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_non_atomic_batch_keeps_prefix() {
        let handle = memory().await;
        seed(&handle).await;
        let batch = vec![insert(1, None), insert(2, None), insert(1, None)];

        assert!(handle.execute_all(&batch, false).await.is_err());
        let rows = handle
            .fetch_all(&Statement::new("SELECT id, label, flag, score FROM t"), &columns())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let handle = memory().await;
        assert_eq!(handle.execute_all(&[], true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_handle_rejects_statements() {
        let handle = memory().await;
        Driver::disconnect(&handle).await;
        assert!(!Driver::is_connected(&handle));
        let err = handle.execute(&Statement::new("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, DataError::Connection(_)));
    }
}
