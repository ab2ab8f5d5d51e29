//! Data access manager for dbkit.
//!
//! A [`DataManager`] wraps an open connection and offers table creation and
//! CRUD over row types implementing [`Table`](dbkit_common::Table).

pub mod manager;
pub mod options;

pub use manager::DataManager;
pub use options::{ManagerOptions, TableCreatePolicy};
