//! Statement builders.
//!
//! Every builder takes an already validated [`TableSchema`]; identifiers are
//! quoted and every value travels as a bound parameter.

use dbkit_common::models::CompareOp;
use dbkit_common::{Column, ColumnType, DataError, DataResult, Filter, Scope, SqlValue, TableSchema};

use crate::dialect::Dialect;

/// Name of the single column returned by [`Dialect::table_columns`].
pub const INTROSPECTION_COLUMN: &str = "name";
/// Name of the single column returned by [`Dialect::count`].
pub const COUNT_COLUMN: &str = "row_count";

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl Dialect {
    /// `CREATE TABLE [IF NOT EXISTS] …` with an optional primary key.
    pub fn create_table(
        &self,
        schema: &TableSchema,
        primary_key: Option<&str>,
        if_not_exists: bool,
    ) -> DataResult<Statement> {
        if let Some(pk) = primary_key {
            if schema.column_named(pk).is_none() {
                return Err(DataError::Schema(format!(
                    "primary key `{}` is not a column of table `{}`",
                    pk,
                    schema.name()
                )));
            }
        }

        let mut defs: Vec<String> = schema
            .columns()
            .iter()
            .map(|c| self.column_definition(c, primary_key == Some(c.name.as_str())))
            .collect();
        if let Some(pk) = primary_key {
            defs.push(format!("PRIMARY KEY ({})", self.quote(pk)));
        }

        Ok(Statement::new(format!(
            "CREATE TABLE {}{} ({})",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.quote(schema.name()),
            defs.join(", ")
        )))
    }

    pub fn drop_table(&self, table: &str) -> Statement {
        Statement::new(format!("DROP TABLE IF EXISTS {}", self.quote(table)))
    }

    /// `ALTER TABLE … ADD COLUMN …`; the column is always added as nullable so
    /// existing rows stay valid.
    pub fn add_column(&self, table: &str, column: &Column) -> Statement {
        let column = column.clone().nullable();
        Statement::new(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table),
            self.column_definition(&column, false)
        ))
    }

    /// Lists a table's columns as one text column named `name`.
    pub fn table_columns(&self, table: &str) -> Statement {
        let sql = match self {
            Dialect::MySql => {
                "SELECT CAST(COLUMN_NAME AS CHAR) AS name FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION"
            }
            Dialect::Postgres => {
                "SELECT column_name::text AS name FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => "SELECT name FROM pragma_table_info(?) ORDER BY cid",
        };
        Statement::with_params(sql, vec![SqlValue::Text(table.to_string())])
    }

    pub fn select(&self, schema: &TableSchema, filter: Option<&Filter>) -> DataResult<Statement> {
        let columns: Vec<String> = schema.columns().iter().map(|c| self.quote(&c.name)).collect();
        let sql = format!("SELECT {} FROM {}", columns.join(", "), self.quote(schema.name()));
        self.with_where(sql, Vec::new(), schema, filter)
    }

    pub fn count(&self, schema: &TableSchema, filter: Option<&Filter>) -> DataResult<Statement> {
        let sql = format!(
            "SELECT COUNT(*) AS {} FROM {}",
            COUNT_COLUMN,
            self.quote(schema.name())
        );
        self.with_where(sql, Vec::new(), schema, filter)
    }

    /// `INSERT INTO … VALUES (…)`; `values` must be in column order.
    pub fn insert(&self, schema: &TableSchema, values: Vec<SqlValue>) -> Statement {
        let columns: Vec<String> = schema.columns().iter().map(|c| self.quote(&c.name)).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| self.placeholder(i)).collect();
        Statement::with_params(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.quote(schema.name()),
                columns.join(", "),
                placeholders.join(", ")
            ),
            values,
        )
    }

    /// `UPDATE … SET <every column> WHERE …`; `values` must be in column order.
    pub fn update(
        &self,
        schema: &TableSchema,
        values: Vec<SqlValue>,
        filter: &Filter,
    ) -> DataResult<Statement> {
        let assignments: Vec<String> = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", self.quote(&c.name), self.placeholder(i + 1)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}",
            self.quote(schema.name()),
            assignments.join(", ")
        );
        self.with_where(sql, values, schema, Some(filter))
    }

    pub fn delete(&self, schema: &TableSchema, scope: &Scope) -> DataResult<Statement> {
        let sql = format!("DELETE FROM {}", self.quote(schema.name()));
        match scope {
            Scope::AllRows => Ok(Statement::new(sql)),
            Scope::Matching(filter) => self.with_where(sql, Vec::new(), schema, Some(filter)),
        }
    }

    fn with_where(
        &self,
        mut sql: String,
        params: Vec<SqlValue>,
        schema: &TableSchema,
        filter: Option<&Filter>,
    ) -> DataResult<Statement> {
        let Some(filter) = filter else {
            return Ok(Statement::with_params(sql, params));
        };

        let mut writer = FilterWriter {
            dialect: *self,
            schema,
            sql: String::new(),
            params,
        };
        writer.write(filter)?;
        sql.push_str(" WHERE ");
        sql.push_str(&writer.sql);
        Ok(Statement::with_params(sql, writer.params))
    }
}

/// Renders a filter tree, numbering placeholders after any existing params.
struct FilterWriter<'a> {
    dialect: Dialect,
    schema: &'a TableSchema,
    sql: String,
    params: Vec<SqlValue>,
}

impl<'a> FilterWriter<'a> {
    fn write(&mut self, filter: &Filter) -> DataResult<()> {
        match filter {
            Filter::Compare { column, op, value } => {
                let col = self.column(column)?;
                let bound = self.coerce(value, col)?;
                let quoted = self.dialect.quote(&col.name);
                match (op, bound.is_null()) {
                    (CompareOp::Eq, true) => self.sql.push_str(&format!("{} IS NULL", quoted)),
                    (CompareOp::Ne, true) => self.sql.push_str(&format!("{} IS NOT NULL", quoted)),
                    (_, true) => {
                        return Err(DataError::Query(format!(
                            "cannot compare `{}` with null using `{}`",
                            col.name,
                            op.as_sql()
                        )))
                    }
                    (_, false) => {
                        let placeholder = self.push(bound);
                        self.sql
                            .push_str(&format!("{} {} {}", quoted, op.as_sql(), placeholder));
                    }
                }
            }
            Filter::Like { column, pattern } => {
                let col = self.column(column)?;
                if col.column_type != ColumnType::Text {
                    return Err(DataError::Query(format!(
                        "LIKE needs a text column but `{}` is {}",
                        col.name, col.column_type
                    )));
                }
                let quoted = self.dialect.quote(&col.name);
                let placeholder = self.push(SqlValue::Text(pattern.clone()));
                self.sql.push_str(&format!("{} LIKE {}", quoted, placeholder));
            }
            Filter::In { column, values } => {
                let col = self.column(column)?;
                if values.is_empty() {
                    self.sql.push_str("1 = 0");
                    return Ok(());
                }
                let quoted = self.dialect.quote(&col.name);
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    let bound = self.coerce(value, col)?;
                    placeholders.push(self.push(bound));
                }
                self.sql
                    .push_str(&format!("{} IN ({})", quoted, placeholders.join(", ")));
            }
            Filter::IsNull(column) => {
                let col = self.column(column)?;
                self.sql
                    .push_str(&format!("{} IS NULL", self.dialect.quote(&col.name)));
            }
            Filter::IsNotNull(column) => {
                let col = self.column(column)?;
                self.sql
                    .push_str(&format!("{} IS NOT NULL", self.dialect.quote(&col.name)));
            }
            Filter::And(filters) => self.write_group(filters, " AND ", "1 = 1")?,
            Filter::Or(filters) => self.write_group(filters, " OR ", "1 = 0")?,
            Filter::Not(inner) => {
                self.sql.push_str("NOT (");
                self.write(inner)?;
                self.sql.push(')');
            }
        }
        Ok(())
    }

    fn write_group(&mut self, filters: &[Filter], joiner: &str, empty: &str) -> DataResult<()> {
        if filters.is_empty() {
            self.sql.push_str(empty);
            return Ok(());
        }
        self.sql.push('(');
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            self.write(filter)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn column(&self, name: &str) -> DataResult<&'a Column> {
        self.schema.column_named(name).ok_or_else(|| {
            DataError::Query(format!(
                "unknown column `{}` in filter on table `{}`",
                name,
                self.schema.name()
            ))
        })
    }

    fn coerce(&self, value: &serde_json::Value, column: &Column) -> DataResult<SqlValue> {
        SqlValue::coerce(value, column).map_err(|m| DataError::Query(format!("filter: {}", m)))
    }

    fn push(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .column(Column::integer("id"))
            .column(Column::text("name"))
            .column(Column::text("email").nullable())
            .column(Column::boolean("active"))
    }

    #[test]
    fn test_create_table() {
        let stmt = Dialect::Sqlite.create_table(&users(), Some("id"), true).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" INTEGER NOT NULL, \"name\" TEXT NOT NULL, \
             \"email\" TEXT, \"active\" BOOLEAN NOT NULL, PRIMARY KEY (\"id\"))"
        );

        let stmt = Dialect::MySql.create_table(&users(), None, false).unwrap();
        assert!(stmt.sql.starts_with("CREATE TABLE `users` (`id` BIGINT NOT NULL"));
        assert!(!stmt.sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_create_table_unknown_primary_key() {
        let err = Dialect::Postgres.create_table(&users(), Some("uuid"), true).unwrap_err();
        assert!(matches!(err, DataError::Schema(_)));
    }

    #[test]
    fn test_add_column_is_nullable() {
        let stmt = Dialect::Postgres.add_column("users", &Column::integer("age"));
        assert_eq!(stmt.sql, "ALTER TABLE \"users\" ADD COLUMN \"age\" BIGINT");
    }

    #[test]
    fn test_select_without_filter() {
        let stmt = Dialect::MySql.select(&users(), None).unwrap();
        assert_eq!(stmt.sql, "SELECT `id`, `name`, `email`, `active` FROM `users`");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_with_filter_postgres_numbering() {
        let filter = Filter::eq("active", true).and(Filter::is_in("id", [1, 2]));
        let stmt = Dialect::Postgres.select(&users(), Some(&filter)).unwrap();
        assert!(stmt
            .sql
            .ends_with("WHERE (\"active\" = $1 AND \"id\" IN ($2, $3))"));
        assert_eq!(
            stmt.params,
            vec![SqlValue::Boolean(true), SqlValue::Integer(1), SqlValue::Integer(2)]
        );
    }

    #[test]
    fn test_update_numbers_filter_after_assignments() {
        let values = vec![
            SqlValue::Integer(1),
            SqlValue::Text("ann".into()),
            SqlValue::Null(ColumnType::Text),
            SqlValue::Boolean(false),
        ];
        let stmt = Dialect::Postgres
            .update(&users(), values, &Filter::eq("id", 1))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"id\" = $1, \"name\" = $2, \"email\" = $3, \"active\" = $4 \
             WHERE \"id\" = $5"
        );
        assert_eq!(stmt.params.len(), 5);
    }

    #[test]
    fn test_delete_scopes() {
        let all = Dialect::Sqlite.delete(&users(), &Scope::AllRows).unwrap();
        assert_eq!(all.sql, "DELETE FROM \"users\"");

        let some = Dialect::Sqlite
            .delete(&users(), &Filter::like("name", "a%").into())
            .unwrap();
        assert_eq!(some.sql, "DELETE FROM \"users\" WHERE \"name\" LIKE ?");
        assert_eq!(some.params, vec![SqlValue::Text("a%".into())]);
    }

    #[test]
    fn test_null_comparisons() {
        let stmt = Dialect::Sqlite
            .select(&users(), Some(&Filter::eq("email", serde_json::Value::Null)))
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE \"email\" IS NULL"));
        assert!(stmt.params.is_empty());

        let err = Dialect::Sqlite
            .select(&users(), Some(&Filter::gt("email", serde_json::Value::Null)))
            .unwrap_err();
        assert!(matches!(err, DataError::Query(_)));
    }

    #[test]
    fn test_empty_groups() {
        let stmt = Dialect::Sqlite
            .count(&users(), Some(&Filter::is_in("id", Vec::<i64>::new())))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS row_count FROM \"users\" WHERE 1 = 0");

        let stmt = Dialect::Sqlite.count(&users(), Some(&Filter::all([]))).unwrap();
        assert!(stmt.sql.ends_with("WHERE 1 = 1"));
    }

    #[test]
    fn test_not() {
        let stmt = Dialect::MySql
            .select(&users(), Some(&!Filter::is_null("email")))
            .unwrap();
        assert!(stmt.sql.ends_with("WHERE NOT (`email` IS NULL)"));
    }

    #[test]
    fn test_filter_rejects_unknown_column_and_bad_literal() {
        let err = Dialect::Sqlite
            .select(&users(), Some(&Filter::eq("age", 3)))
            .unwrap_err();
        assert!(matches!(err, DataError::Query(m) if m.contains("`age`")));

        let err = Dialect::Sqlite
            .select(&users(), Some(&Filter::eq("id", "three")))
            .unwrap_err();
        assert!(matches!(err, DataError::Query(_)));

        let err = Dialect::Sqlite
            .select(&users(), Some(&Filter::like("id", "1%")))
            .unwrap_err();
        assert!(matches!(err, DataError::Query(_)));
    }

    #[test]
    fn test_table_columns_binds_table_name() {
        let stmt = Dialect::Postgres.table_columns("users");
        assert!(stmt.sql.contains("table_name = $1"));
        assert_eq!(stmt.params, vec![SqlValue::Text("users".into())]);
    }
}
