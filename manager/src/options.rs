//! Manager options.

/// How [`DataManager::create_table`](crate::DataManager::create_table) treats
/// an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableCreatePolicy {
    /// Create the table if missing, then add any columns it lacks.
    #[default]
    Reconcile,
    /// Drop the table if it exists and create it afresh.
    DropIfExists,
    /// Create the table; fail if it already exists.
    MustNotExist,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Run multi-statement operations in a single transaction.
    pub atomic_batches: bool,
}

impl ManagerOptions {
    pub fn atomic() -> Self {
        Self {
            atomic_batches: true,
        }
    }
}
