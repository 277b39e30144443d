//! Row-level contract for the hosted relational store.
//!
//! The store is an external collaborator: it offers no cross-table
//! transactions, so everything above this layer is built from ordered,
//! idempotent row operations (select / insert / update / delete / upsert)
//! keyed by explicit table names and column predicates.

pub mod mem;
pub mod pg;
pub mod tables;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub use mem::MemStore;
pub use pg::{create_pool, PgStore};

/// Store-level error, reported per table so partial scans can continue
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query against table {table} failed: {message}")]
    Query { table: String, message: String },

    #[error("failed to decode row from table {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

/// A scalar bound into a query. Timestamps carry their type so the
/// Postgres backend binds them as timestamptz rather than text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
    Null,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// JSON representation as stored in a row payload
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Int(i) => JsonValue::from(*i),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Timestamp(t) => JsonValue::String(t.to_rfc3339()),
            Value::Json(v) => v.clone(),
            Value::Null => JsonValue::Null,
        }
    }
}

/// Equality/range predicate over a single table
#[derive(Debug, Clone)]
pub enum Filter {
    Eq(String, Value),
    Lte(String, Value),
    IsNull(String),
    /// OR-group: matches when any (column, value) pair matches
    AnyEq(Vec<(String, Value)>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Filter::Eq(column.into(), value)
    }

    pub fn lte(column: impl Into<String>, value: Value) -> Self {
        Filter::Lte(column.into(), value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }
}

/// Ordering for selects
#[derive(Debug, Clone)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Order {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Order {
            column: column.into(),
            descending: true,
        }
    }
}

/// Row-level CRUD against the relational store.
///
/// Rows travel as JSON objects and are decoded into per-table structs at
/// the caller's boundary. `update` and `delete` return the number of rows
/// affected; a conditional update with zero rows affected is how callers
/// implement compare-and-set transitions.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Order>,
        limit: Option<i64>,
    ) -> Result<Vec<JsonValue>, StoreError>;

    async fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<(), StoreError>;

    async fn update(
        &self,
        table: &str,
        set: &[(&str, Value)],
        filters: &[Filter],
    ) -> Result<u64, StoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    async fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        row: &[(&str, Value)],
    ) -> Result<(), StoreError>;
}

/// Validate a table/column identifier before it is spliced into SQL.
///
/// Identifiers only ever come from this crate's own table vocabulary, so
/// anything outside snake_case is a programming error surfaced loudly.
pub fn check_ident(ident: &str) -> Result<&str, StoreError> {
    let ok = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(ident)
    } else {
        Err(StoreError::InvalidIdentifier(ident.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ident() {
        assert!(check_ident("tenant_memberships").is_ok());
        assert!(check_ident("user_profiles").is_ok());
        assert!(check_ident("").is_err());
        assert!(check_ident("users; drop table users").is_err());
        assert!(check_ident("Users").is_err());
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(Value::text("a").to_json(), serde_json::json!("a"));
        assert_eq!(Value::Bool(false).to_json(), serde_json::json!(false));
        assert_eq!(Value::Null.to_json(), JsonValue::Null);
    }
}
