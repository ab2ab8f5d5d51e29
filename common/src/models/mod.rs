//! Shared data models for the adapter and the manager.

pub mod filter;
mod finite;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use filter::{CompareOp, Filter, Scope};
pub use schema::{Column, ColumnType, Record, Table, TableSchema};
pub use value::SqlValue;
