//! Filter expressions used to scope reads, updates and deletes.
//!
//! A [`Filter`] is a backend-neutral predicate tree. Column names are checked
//! against the row type's schema and literals are coerced to the column type
//! when the statement is built.

use std::ops::Not;

use serde_json::Value;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Returns the SQL operator text.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean predicate over a row type's columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column <op> value`; comparing against null renders `IS [NOT] NULL`.
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column LIKE pattern`.
    Like { column: String, pattern: String },
    /// `column IN (values…)`; an empty list matches nothing.
    In { column: String, values: Vec<Value> },
    IsNull(String),
    IsNotNull(String),
    /// Conjunction; an empty list matches everything.
    And(Vec<Filter>),
    /// Disjunction; an empty list matches nothing.
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNotNull(column.into())
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines with `AND`, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut filters) => {
                filters.push(other);
                Filter::And(filters)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Combines with `OR`, flattening nested disjunctions.
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut filters) => {
                filters.push(other);
                Filter::Or(filters)
            }
            first => Filter::Or(vec![first, other]),
        }
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

/// Which rows a delete touches.
///
/// Deleting every row needs the explicit [`Scope::AllRows`] marker; there is
/// no "absent filter" shortcut.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Matching(Filter),
    AllRows,
}

impl From<Filter> for Scope {
    fn from(filter: Filter) -> Self {
        Scope::Matching(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        assert_eq!(
            Filter::eq("id", 5),
            Filter::Compare {
                column: "id".into(),
                op: CompareOp::Eq,
                value: json!(5)
            }
        );
        assert_eq!(
            Filter::is_in("id", [1, 2]),
            Filter::In {
                column: "id".into(),
                values: vec![json!(1), json!(2)]
            }
        );
    }

    #[test]
    fn test_and_or_flatten() {
        let filter = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));
        assert!(matches!(&filter, Filter::And(parts) if parts.len() == 3));

        let filter = Filter::eq("a", 1).or(Filter::eq("b", 2)).or(Filter::eq("c", 3));
        assert!(matches!(&filter, Filter::Or(parts) if parts.len() == 3));
    }

    #[test]
    fn test_double_negation_cancels() {
        let filter = Filter::is_null("email");
        assert_eq!(!!filter.clone(), filter);
        assert!(matches!(!filter, Filter::Not(_)));
    }

    #[test]
    fn test_scope_from_filter() {
        let scope: Scope = Filter::eq("id", 1).into();
        assert!(matches!(scope, Scope::Matching(_)));
    }
}
