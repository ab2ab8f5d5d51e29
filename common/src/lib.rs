//! Shared building blocks for the dbkit data-access layer.
//!
//! - `config`: connection configuration, driver kinds and pool settings
//! - `errors`: the error taxonomy returned by every operation
//! - `models`: row-type schemas, bind values and filter expressions
//! - `utils`: identifier validation

pub mod config;
pub mod errors;
pub mod models;
pub mod utils;

pub use config::{ConnectionConfiguration, DriverKind, PoolSettings, ResolvedConfiguration};
pub use errors::{DataError, DataResult};
pub use models::{Column, ColumnType, Filter, Record, Scope, SqlValue, Table, TableSchema};
