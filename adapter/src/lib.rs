//! Connection adapter for dbkit.
//!
//! Turns a [`ConnectionConfiguration`](dbkit_common::ConnectionConfiguration)
//! into a live [`ConnectionHandle`], and provides the [`Driver`] capability
//! the manager issues statements through:
//! - `adapter`: configuration resolution and pool construction
//! - `handle`: the live connection and its teardown
//! - `dialect` / `statement`: per-backend SQL text
//! - `driver`: statement execution and row decoding

pub mod adapter;
pub mod dialect;
pub mod driver;
pub mod handle;
pub mod statement;

pub use adapter::ConnectionAdapter;
pub use dialect::Dialect;
pub use driver::Driver;
pub use handle::{ConnectionHandle, DatabasePool, PoolStats};
pub use statement::Statement;
