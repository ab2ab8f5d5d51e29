//! SQL dialects.

use dbkit_common::{Column, ColumnType, DriverKind};

/// The SQL flavour a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl From<DriverKind> for Dialect {
    fn from(kind: DriverKind) -> Self {
        match kind {
            DriverKind::MySQL => Dialect::MySql,
            DriverKind::PostgreSQL => Dialect::Postgres,
            DriverKind::SQLite => Dialect::Sqlite,
        }
    }
}

impl Dialect {
    /// Quotes an identifier. Identifiers are validated before they get here.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident),
        }
    }

    /// Returns the placeholder for the `index`-th parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Returns the column type name used in DDL.
    pub fn type_name(&self, column_type: ColumnType, primary_key: bool) -> &'static str {
        match (self, column_type) {
            (Dialect::MySql, ColumnType::Integer) => "BIGINT",
            (Dialect::MySql, ColumnType::Real) => "DOUBLE",
            // MySQL cannot index an unbounded TEXT key
            (Dialect::MySql, ColumnType::Text) if primary_key => "VARCHAR(255)",
            (Dialect::MySql, ColumnType::Text) => "TEXT",
            (Dialect::MySql, ColumnType::Boolean) => "BOOLEAN",
            (Dialect::Postgres, ColumnType::Integer) => "BIGINT",
            (Dialect::Postgres, ColumnType::Real) => "DOUBLE PRECISION",
            (Dialect::Postgres, ColumnType::Text) => "TEXT",
            (Dialect::Postgres, ColumnType::Boolean) => "BOOLEAN",
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnType::Real) => "REAL",
            (Dialect::Sqlite, ColumnType::Text) => "TEXT",
            (Dialect::Sqlite, ColumnType::Boolean) => "BOOLEAN",
        }
    }

    /// Renders `"name" TYPE [NOT NULL]`.
    pub fn column_definition(&self, column: &Column, primary_key: bool) -> String {
        let mut def = format!(
            "{} {}",
            self.quote(&column.name),
            self.type_name(column.column_type, primary_key)
        );
        if primary_key || !column.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(Dialect::MySql.quote("users"), "`users`");
        assert_eq!(Dialect::Postgres.quote("users"), "\"users\"");
        assert_eq!(Dialect::Sqlite.quote("users"), "\"users\"");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::MySql.placeholder(3), "?");
        assert_eq!(Dialect::Sqlite.placeholder(1), "?");
    }

    #[test]
    fn test_mysql_text_primary_key_is_bounded() {
        assert_eq!(Dialect::MySql.type_name(ColumnType::Text, true), "VARCHAR(255)");
        assert_eq!(Dialect::MySql.type_name(ColumnType::Text, false), "TEXT");
        assert_eq!(Dialect::Postgres.type_name(ColumnType::Text, true), "TEXT");
    }

    #[test]
    fn test_column_definition() {
        assert_eq!(
            Dialect::Postgres.column_definition(&Column::real("price"), false),
            "\"price\" DOUBLE PRECISION NOT NULL"
        );
        assert_eq!(
            Dialect::Sqlite.column_definition(&Column::text("email").nullable(), false),
            "\"email\" TEXT"
        );
        assert_eq!(
            Dialect::MySql.column_definition(&Column::text("code").nullable(), true),
            "`code` VARCHAR(255) NOT NULL"
        );
    }

    #[test]
    fn test_from_driver_kind() {
        assert_eq!(Dialect::from(DriverKind::MySQL), Dialect::MySql);
        assert_eq!(Dialect::from(DriverKind::PostgreSQL), Dialect::Postgres);
        assert_eq!(Dialect::from(DriverKind::SQLite), Dialect::Sqlite);
    }
}
