//! Row-type schemas.
//!
//! A row type is any serde type that implements [`Table`]. The table it maps
//! to is resolved statically from the type, never from a value's runtime shape.

use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{DataError, DataResult};
use crate::utils::IdentifierValidator;

use super::finite::ensure_finite;
use super::value::SqlValue;

/// A decoded row: column name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Semantic column types understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// Double-precision float.
    Real,
    /// Unbounded text.
    Text,
    /// Boolean.
    Boolean,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Boolean => write!(f, "boolean"),
        }
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// Creates a non-nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    /// Marks the column as accepting NULL (maps to `Option<_>` fields).
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// The table a row type maps to and its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Appends a column; column order is statement order.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by exact name.
    pub fn column_named(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Checks identifiers, that there is at least one column and that names are unique.
    pub fn validate(&self) -> DataResult<()> {
        IdentifierValidator::validate(&self.name)?;

        if self.columns.is_empty() {
            return Err(DataError::TypeResolution(format!(
                "table `{}` declares no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            IdentifierValidator::validate(&column.name)?;
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(DataError::TypeResolution(format!(
                    "table `{}` declares column `{}` twice",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }

    /// Converts a record into one parameter per column, in column order.
    pub fn to_values<T: Serialize>(&self, record: &T) -> DataResult<Vec<SqlValue>> {
        ensure_finite(record)
            .map_err(|e| e.with_context(format!("record for table `{}`", self.name)))?;

        let fields = match serde_json::to_value(record) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                return Err(DataError::TypeResolution(format!(
                    "record for table `{}` serialized to {} instead of a field map",
                    self.name,
                    if other.is_array() { "an array" } else { "a scalar" }
                )))
            }
            Err(e) => {
                return Err(DataError::TypeResolution(format!(
                    "record for table `{}` is not serializable: {}",
                    self.name, e
                )))
            }
        };

        if let Some(extra) = fields.keys().find(|k| self.column_named(k).is_none()) {
            return Err(DataError::TypeResolution(format!(
                "field `{}` has no column in table `{}`",
                extra, self.name
            )));
        }

        self.columns
            .iter()
            .map(|column| match fields.get(&column.name) {
                Some(value) => SqlValue::coerce(value, column).map_err(|m| {
                    DataError::TypeResolution(format!("table `{}`: {}", self.name, m))
                }),
                None if column.nullable => Ok(SqlValue::Null(column.column_type)),
                None => Err(DataError::TypeResolution(format!(
                    "record for table `{}` is missing field `{}`",
                    self.name, column.name
                ))),
            })
            .collect()
    }

    /// Deserializes a decoded row into the row type.
    pub fn from_record<T: DeserializeOwned>(&self, record: Record) -> DataResult<T> {
        serde_json::from_value(Value::Object(record)).map_err(|e| {
            DataError::TypeResolution(format!(
                "row from table `{}` does not fit the row type: {}",
                self.name, e
            ))
        })
    }
}

/// A row type bound to one table.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { id: i64, name: String, email: Option<String> }
///
/// impl Table for User {
///     fn schema() -> TableSchema {
///         TableSchema::new("users")
///             .column(Column::integer("id"))
///             .column(Column::text("name"))
///             .column(Column::text("email").nullable())
///     }
/// }
/// ```
pub trait Table: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the table name and column layout for this row type.
    fn schema() -> TableSchema;
}
