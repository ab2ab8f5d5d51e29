//! Data access manager.

use dbkit_adapter::statement::{COUNT_COLUMN, INTROSPECTION_COLUMN};
use dbkit_adapter::{ConnectionHandle, Dialect, Driver, Statement};
use dbkit_common::{Column, DataError, DataResult, Filter, Scope, Table, TableSchema};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::options::{ManagerOptions, TableCreatePolicy};

/// Table creation and CRUD over one open connection.
///
/// The manager never opens a connection itself; it is handed one at
/// construction and issues every statement through it. Statements within one
/// operation run sequentially.
pub struct DataManager<D: Driver = ConnectionHandle> {
    driver: D,
    options: ManagerOptions,
}

impl<D: Driver> DataManager<D> {
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, ManagerOptions::default())
    }

    pub fn with_options(driver: D, options: ManagerOptions) -> Self {
        Self { driver, options }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Returns the validated schema of `T`.
    pub fn resolve_schema<T: Table>(&self) -> DataResult<TableSchema> {
        let schema = T::schema();
        schema.validate()?;
        Ok(schema)
    }

    /// Creates the table backing `T` according to `policy`.
    ///
    /// # Errors
    /// Statement failures and an unknown `primary_key` are reported as
    /// `DataError::Schema`.
    pub async fn create_table<T: Table>(
        &self,
        primary_key: Option<&str>,
        policy: TableCreatePolicy,
    ) -> DataResult<()> {
        let schema = self.resolve_schema::<T>()?;
        info!(table = %schema.name(), ?policy, primary_key = ?primary_key, "creating table");

        self.apply_create(&schema, primary_key, policy)
            .await
            .map_err(|e| {
                e.into_schema()
                    .with_context(format!("not able to create table `{}`", schema.name()))
            })
    }

    async fn apply_create(
        &self,
        schema: &TableSchema,
        primary_key: Option<&str>,
        policy: TableCreatePolicy,
    ) -> DataResult<()> {
        let dialect = self.driver.dialect();
        let table = schema.name();

        match policy {
            TableCreatePolicy::Reconcile => {
                let create = dialect.create_table(schema, primary_key, true)?;
                self.driver.execute(&create).await?;

                let existing = self.existing_columns(table).await?;
                // PostgreSQL folds nothing inside quotes; the others compare
                // column names case-insensitively
                let present = |name: &str| {
                    existing.iter().any(|e| match dialect {
                        Dialect::Postgres => e == name,
                        Dialect::MySql | Dialect::Sqlite => e.eq_ignore_ascii_case(name),
                    })
                };
                let missing: Vec<Statement> = schema
                    .columns()
                    .iter()
                    .filter(|c| !present(&c.name))
                    .map(|c| dialect.add_column(table, c))
                    .collect();
                if !missing.is_empty() {
                    info!(table = %table, added = missing.len(), "adding missing columns");
                }
                self.driver
                    .execute_all(&missing, self.options.atomic_batches)
                    .await?;
            }
            TableCreatePolicy::DropIfExists => {
                let statements = [
                    dialect.drop_table(table),
                    dialect.create_table(schema, primary_key, false)?,
                ];
                self.driver
                    .execute_all(&statements, self.options.atomic_batches)
                    .await?;
            }
            TableCreatePolicy::MustNotExist => {
                let create = dialect.create_table(schema, primary_key, false)?;
                self.driver.execute(&create).await?;
            }
        }
        Ok(())
    }

    /// Drops the table backing `T` if it exists.
    pub async fn drop_table<T: Table>(&self) -> DataResult<()> {
        let schema = self.resolve_schema::<T>()?;
        let statement = self.driver.dialect().drop_table(schema.name());
        self.driver.execute(&statement).await.map_err(|e| {
            e.into_schema()
                .with_context(format!("not able to drop table `{}`", schema.name()))
        })?;
        info!(table = %schema.name(), "dropped table");
        Ok(())
    }

    /// Column names of the table backing `T`, in table order. Empty when the
    /// table does not exist.
    pub async fn table_columns<T: Table>(&self) -> DataResult<Vec<String>> {
        let schema = self.resolve_schema::<T>()?;
        self.existing_columns(schema.name()).await.map_err(|e| {
            e.into_schema()
                .with_context(format!("not able to inspect table `{}`", schema.name()))
        })
    }

    async fn existing_columns(&self, table: &str) -> DataResult<Vec<String>> {
        let statement = self.driver.dialect().table_columns(table);
        let rows = self
            .driver
            .fetch_all(&statement, &[Column::text(INTROSPECTION_COLUMN)])
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| match row.remove(INTROSPECTION_COLUMN) {
                Some(Value::String(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// Reads the rows of `T` matching `filter`, or every row when `filter`
    /// is `None`.
    pub async fn read<T: Table>(&self, filter: Option<&Filter>) -> DataResult<Vec<T>> {
        let schema = self.resolve_schema::<T>()?;
        let context = || format!("not able to read from `{}`", schema.name());

        let statement = self
            .driver
            .dialect()
            .select(&schema, filter)
            .map_err(|e| e.with_context(context()))?;
        let records = self
            .driver
            .fetch_all(&statement, schema.columns())
            .await
            .map_err(|e| e.with_context(context()))?;
        debug!(table = %schema.name(), rows = records.len(), "read");

        records
            .into_iter()
            .map(|record| schema.from_record(record))
            .collect()
    }

    /// Counts the rows of `T` matching `filter`.
    pub async fn count<T: Table>(&self, filter: Option<&Filter>) -> DataResult<u64> {
        let schema = self.resolve_schema::<T>()?;
        let context = || format!("not able to count rows of `{}`", schema.name());

        let statement = self
            .driver
            .dialect()
            .count(&schema, filter)
            .map_err(|e| e.with_context(context()))?;
        let rows = self
            .driver
            .fetch_all(&statement, &[Column::integer(COUNT_COLUMN)])
            .await
            .map_err(|e| e.with_context(context()))?;

        rows.first()
            .and_then(|row| row.get(COUNT_COLUMN))
            .and_then(Value::as_u64)
            .ok_or_else(|| DataError::Query(format!("{}: no row count returned", context())))
    }

    /// Inserts one record into the table of its row type.
    pub async fn insert_one<T: Table>(&self, record: &T) -> DataResult<()> {
        let schema = self.resolve_schema::<T>()?;
        let values = schema.to_values(record)?;
        let statement = self.driver.dialect().insert(&schema, values);

        self.driver.execute(&statement).await.map_err(|e| {
            e.with_context(format!("not able to insert into `{}`", schema.name()))
        })?;
        debug!(table = %schema.name(), "inserted one row");
        Ok(())
    }

    /// Inserts records in input order, one statement per record.
    ///
    /// Each record is converted right before its statement runs. The first
    /// failure, conversion or statement, is a `DataError::Query` naming the
    /// failing position; rows inserted before it remain. With
    /// `atomic_batches`, every record is converted up front and the inserts
    /// run in one transaction, so a failure leaves no rows behind.
    pub async fn insert_many<T: Table>(&self, records: &[T]) -> DataResult<u64> {
        if records.is_empty() {
            debug!("insert_many called with no records");
            return Ok(0);
        }

        let schema = self.resolve_schema::<T>()?;
        let dialect = self.driver.dialect();
        let total = records.len();
        let context = || format!("not able to insert into `{}`", schema.name());
        let position = |i: usize| format!("record {} of {}", i + 1, total);
        let convert = |i: usize, record: &T| {
            schema
                .to_values(record)
                .map(|values| dialect.insert(&schema, values))
                .map_err(|e| e.into_query().with_context(position(i)).with_context(context()))
        };

        let inserted = if self.options.atomic_batches {
            let statements = records
                .iter()
                .enumerate()
                .map(|(i, record)| convert(i, record))
                .collect::<DataResult<Vec<_>>>()?;
            self.driver
                .execute_all(&statements, true)
                .await
                .map_err(|e| e.with_context(context()))?
        } else {
            let mut inserted = 0;
            for (i, record) in records.iter().enumerate() {
                let statement = convert(i, record)?;
                inserted += self
                    .driver
                    .execute(&statement)
                    .await
                    .map_err(|e| e.with_context(position(i)).with_context(context()))?;
            }
            inserted
        };
        debug!(table = %schema.name(), rows = inserted, "inserted rows");
        Ok(inserted)
    }

    /// Overwrites every column of the rows matching `filter` with `record`.
    ///
    /// Without a filter nothing is executed and `Ok(0)` is returned.
    pub async fn update<T: Table>(&self, record: &T, filter: Option<&Filter>) -> DataResult<u64> {
        let schema = self.resolve_schema::<T>()?;
        let Some(filter) = filter else {
            warn!(table = %schema.name(), "update without a filter ignored");
            return Ok(0);
        };

        let context = || format!("not able to update `{}`", schema.name());
        let values = schema.to_values(record)?;
        let statement = self
            .driver
            .dialect()
            .update(&schema, values, filter)
            .map_err(|e| e.with_context(context()))?;
        let updated = self
            .driver
            .execute(&statement)
            .await
            .map_err(|e| e.with_context(context()))?;
        debug!(table = %schema.name(), rows = updated, "updated rows");
        Ok(updated)
    }

    /// Deletes the rows of `T` in `scope`.
    pub async fn delete<T: Table>(&self, scope: Scope) -> DataResult<u64> {
        let schema = self.resolve_schema::<T>()?;
        let context = || format!("not able to delete from `{}`", schema.name());

        let statement = self
            .driver
            .dialect()
            .delete(&schema, &scope)
            .map_err(|e| e.with_context(context()))?;
        let deleted = self
            .driver
            .execute(&statement)
            .await
            .map_err(|e| e.with_context(context()))?;
        if matches!(scope, Scope::AllRows) {
            info!(table = %schema.name(), rows = deleted, "deleted all rows");
        } else {
            debug!(table = %schema.name(), rows = deleted, "deleted rows");
        }
        Ok(deleted)
    }

    /// Releases the connection; idempotent.
    pub async fn disconnect(&self) {
        self.driver.disconnect().await
    }
}
