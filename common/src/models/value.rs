//! Typed bind parameters.

use serde_json::Value;

use super::schema::{Column, ColumnType};

/// A statement parameter, typed by the column it is bound against.
///
/// `Null` keeps its column type so backends with strict parameter typing
/// (PostgreSQL) receive a correctly typed NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(ColumnType),
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl SqlValue {
    /// Converts a JSON value into a parameter for `column`.
    ///
    /// Returns a description of the mismatch when the value does not fit the
    /// column type; callers decide which error category it belongs to.
    pub fn coerce(value: &Value, column: &Column) -> Result<SqlValue, String> {
        let mismatch = || {
            format!(
                "column `{}` expects {} but got {}",
                column.name,
                column.column_type,
                describe(value)
            )
        };

        match (column.column_type, value) {
            (ty, Value::Null) => Ok(SqlValue::Null(ty)),
            (ColumnType::Integer, Value::Number(n)) => {
                n.as_i64().map(SqlValue::Integer).ok_or_else(mismatch)
            }
            (ColumnType::Real, Value::Number(n)) => {
                n.as_f64().map(SqlValue::Real).ok_or_else(mismatch)
            }
            (ColumnType::Text, Value::String(s)) => Ok(SqlValue::Text(s.clone())),
            (ColumnType::Boolean, Value::Bool(b)) => Ok(SqlValue::Boolean(*b)),
            _ => Err(mismatch()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a floating-point number",
        Value::Number(_) => "an out-of-range integer",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_matching_types() {
        assert_eq!(
            SqlValue::coerce(&json!(42), &Column::integer("id")),
            Ok(SqlValue::Integer(42))
        );
        assert_eq!(
            SqlValue::coerce(&json!(7), &Column::real("price")),
            Ok(SqlValue::Real(7.0))
        );
        assert_eq!(
            SqlValue::coerce(&json!("bob"), &Column::text("name")),
            Ok(SqlValue::Text("bob".into()))
        );
        assert_eq!(
            SqlValue::coerce(&json!(true), &Column::boolean("active")),
            Ok(SqlValue::Boolean(true))
        );
    }

    #[test]
    fn test_null_keeps_column_type() {
        let value = SqlValue::coerce(&Value::Null, &Column::text("email").nullable()).unwrap();
        assert_eq!(value, SqlValue::Null(ColumnType::Text));
        assert!(value.is_null());
    }

    #[test]
    fn test_coerce_rejects_mismatch() {
        let err = SqlValue::coerce(&json!("1"), &Column::integer("id")).unwrap_err();
        assert!(err.contains("`id`"));
        assert!(err.contains("a string"));

        assert!(SqlValue::coerce(&json!(1.5), &Column::integer("id")).is_err());
        assert!(SqlValue::coerce(&json!(u64::MAX), &Column::integer("id")).is_err());
        assert!(SqlValue::coerce(&json!(1), &Column::boolean("active")).is_err());
        assert!(SqlValue::coerce(&json!([1]), &Column::text("tags")).is_err());
    }
}
