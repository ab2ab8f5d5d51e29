//! Error types shared by the adapter and the manager.

use std::fmt::Display;

use thiserror::Error;

/// Errors returned by every data-access operation.
///
/// Each variant carries a message that includes the underlying cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Establishing, using or tearing down the connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Creating, reconciling or dropping a table failed.
    #[error("schema error: {0}")]
    Schema(String),

    /// A read, insert, update or delete statement failed.
    #[error("query error: {0}")]
    Query(String),

    /// A row type, record or row did not match the declared table schema.
    #[error("type resolution error: {0}")]
    TypeResolution(String),
}

impl DataError {
    /// Returns a stable error code for logs and tooling.
    pub fn code(&self) -> &'static str {
        match self {
            DataError::Connection(_) => "CONNECTION_ERROR",
            DataError::Schema(_) => "SCHEMA_ERROR",
            DataError::Query(_) => "QUERY_ERROR",
            DataError::TypeResolution(_) => "TYPE_RESOLUTION_ERROR",
        }
    }

    /// Prefixes the message with what the caller was doing, keeping the category.
    pub fn with_context(self, context: impl Display) -> Self {
        match self {
            DataError::Connection(m) => DataError::Connection(format!("{}: {}", context, m)),
            DataError::Schema(m) => DataError::Schema(format!("{}: {}", context, m)),
            DataError::Query(m) => DataError::Query(format!("{}: {}", context, m)),
            DataError::TypeResolution(m) => {
                DataError::TypeResolution(format!("{}: {}", context, m))
            }
        }
    }

    /// Re-tags a record conversion failure as a statement failure, for
    /// batches that report the failing position as a query error.
    pub fn into_query(self) -> Self {
        match self {
            DataError::TypeResolution(m) => DataError::Query(m),
            other => other,
        }
    }

    /// Re-tags a statement failure as a schema failure (used for DDL).
    pub fn into_schema(self) -> Self {
        match self {
            DataError::Query(m) => DataError::Schema(m),
            other => other,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => {
                DataError::Connection("connection pool is closed".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                DataError::Connection("connection pool timed out".to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Configuration(_) => {
                DataError::Connection(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => DataError::TypeResolution(err.to_string()),
            _ => DataError::Query(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for DataError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DataError::Connection(format!("invalid configuration: {}", errors))
    }
}

/// Result type for data-access operations.
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_category() {
        let err = DataError::Query("duplicate key".into()).with_context("not able to insert");
        assert_eq!(err, DataError::Query("not able to insert: duplicate key".into()));
        assert_eq!(err.code(), "QUERY_ERROR");
    }

    #[test]
    fn test_into_schema_only_retags_query() {
        assert_eq!(
            DataError::Query("boom".into()).into_schema(),
            DataError::Schema("boom".into())
        );
        assert_eq!(
            DataError::Connection("down".into()).into_schema(),
            DataError::Connection("down".into())
        );
    }

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err = DataError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, DataError::Connection(_)));
    }

    #[test]
    fn test_column_not_found_is_type_resolution() {
        let err = DataError::from(sqlx::Error::ColumnNotFound("email".into()));
        assert!(matches!(err, DataError::TypeResolution(_)));
    }

    #[test]
    fn test_into_query_only_retags_conversion_failures() {
        let err = DataError::TypeResolution("bad value".into()).into_query();
        assert_eq!(err, DataError::Query("bad value".into()));
        let err = DataError::Connection("closed".into()).into_query();
        assert_eq!(err, DataError::Connection("closed".into()));
    }

    #[test]
    fn test_display_includes_cause() {
        let err = DataError::Schema("table exists".into());
        assert_eq!(err.to_string(), "schema error: table exists");
    }
}
