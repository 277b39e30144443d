//! In-memory row store used by tests and local development.
//!
//! Behaves like the Postgres backend at the trait boundary, including the
//! zero-rows-affected result conditional updates rely on. Individual
//! tables can be failed on demand to exercise partial-failure paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{Filter, Order, RowStore, StoreError, Value};

#[derive(Default)]
pub struct MemStore {
    tables: Mutex<HashMap<String, Vec<JsonMap<String, JsonValue>>>>,
    fail_tables: Mutex<HashSet<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation against `table` fail until cleared
    pub fn fail_table(&self, table: &str) {
        if let Ok(mut failed) = self.fail_tables.lock() {
            failed.insert(table.to_string());
        }
    }

    /// Clear an injected failure
    pub fn clear_failure(&self, table: &str) {
        if let Ok(mut failed) = self.fail_tables.lock() {
            failed.remove(table);
        }
    }

    /// Insert a raw JSON object row, bypassing the trait (test setup)
    pub fn seed(&self, table: &str, row: JsonValue) {
        if let (Ok(mut tables), JsonValue::Object(map)) = (self.tables.lock(), row) {
            tables.entry(table.to_string()).or_default().push(map);
        }
    }

    fn check_available(&self, table: &str) -> Result<(), StoreError> {
        let failed = self
            .fail_tables
            .lock()
            .map_err(|_| poisoned(table))?
            .contains(table);
        if failed {
            Err(StoreError::Query {
                table: table.to_string(),
                message: "injected failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn poisoned(table: &str) -> StoreError {
    StoreError::Query {
        table: table.to_string(),
        message: "store lock poisoned".to_string(),
    }
}

fn cell<'a>(row: &'a JsonMap<String, JsonValue>, column: &str) -> &'a JsonValue {
    row.get(column).unwrap_or(&JsonValue::Null)
}

fn as_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn value_eq(cell: &JsonValue, value: &Value) -> bool {
    match value {
        Value::Timestamp(t) => as_timestamp(cell) == Some(*t),
        Value::Null => cell.is_null(),
        other => *cell == other.to_json(),
    }
}

fn value_lte(cell: &JsonValue, value: &Value) -> bool {
    match value {
        Value::Timestamp(t) => as_timestamp(cell).is_some_and(|c| c <= *t),
        Value::Int(i) => cell.as_i64().is_some_and(|c| c <= *i),
        Value::Text(s) => cell.as_str().is_some_and(|c| c <= s.as_str()),
        _ => false,
    }
}

fn matches(row: &JsonMap<String, JsonValue>, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => value_eq(cell(row, column), value),
        Filter::Lte(column, value) => value_lte(cell(row, column), value),
        Filter::IsNull(column) => cell(row, column).is_null(),
        Filter::AnyEq(pairs) => pairs
            .iter()
            .any(|(column, value)| value_eq(cell(row, column), value)),
    }
}

fn matches_all(row: &JsonMap<String, JsonValue>, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn compare_cells(a: &JsonValue, b: &JsonValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RowStore for MemStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Order>,
        limit: Option<i64>,
    ) -> Result<Vec<JsonValue>, StoreError> {
        self.check_available(table)?;
        let tables = self.tables.lock().map_err(|_| poisoned(table))?;
        let mut rows: Vec<JsonMap<String, JsonValue>> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches_all(r, filters)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(cell(a, &order.column), cell(b, &order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }

        Ok(rows.into_iter().map(JsonValue::Object).collect())
    }

    async fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<(), StoreError> {
        self.check_available(table)?;
        let mut tables = self.tables.lock().map_err(|_| poisoned(table))?;
        let map: JsonMap<String, JsonValue> = row
            .iter()
            .map(|(column, value)| (column.to_string(), value.to_json()))
            .collect();
        tables.entry(table.to_string()).or_default().push(map);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        set: &[(&str, Value)],
        filters: &[Filter],
    ) -> Result<u64, StoreError> {
        self.check_available(table)?;
        let mut tables = self.tables.lock().map_err(|_| poisoned(table))?;
        let mut affected = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
                for (column, value) in set {
                    row.insert(column.to_string(), value.to_json());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        self.check_available(table)?;
        let mut tables = self.tables.lock().map_err(|_| poisoned(table))?;
        let mut affected = 0;
        if let Some(rows) = tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|r| !matches_all(r, filters));
            affected = (before - rows.len()) as u64;
        }
        Ok(affected)
    }

    async fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        row: &[(&str, Value)],
    ) -> Result<(), StoreError> {
        self.check_available(table)?;
        let mut tables = self.tables.lock().map_err(|_| poisoned(table))?;
        let rows = tables.entry(table.to_string()).or_default();
        let key_value = row
            .iter()
            .find(|(column, _)| *column == conflict_key)
            .map(|(_, value)| value.to_json())
            .unwrap_or(JsonValue::Null);

        if let Some(existing) = rows.iter_mut().find(|r| *cell(r, conflict_key) == key_value) {
            for (column, value) in row {
                existing.insert(column.to_string(), value.to_json());
            }
        } else {
            let map: JsonMap<String, JsonValue> = row
                .iter()
                .map(|(column, value)| (column.to_string(), value.to_json()))
                .collect();
            rows.push(map);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_returns_rows_affected() {
        let store = MemStore::new();
        store.seed("tenants", json!({"id": "t1", "name": "Acme"}));
        store.seed("tenants", json!({"id": "t2", "name": "Acme"}));

        let affected = store
            .update(
                "tenants",
                &[("name", Value::text("Acme Ltd"))],
                &[Filter::eq("name", Value::text("Acme"))],
            )
            .await
            .unwrap();
        assert_eq!(affected, 2);

        // Re-running the same update matches nothing
        let affected = store
            .update(
                "tenants",
                &[("name", Value::text("Acme Ltd"))],
                &[Filter::eq("name", Value::text("Acme"))],
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_any_eq_filter() {
        let store = MemStore::new();
        store.seed("sales", json!({"id": "s1", "created_by": "u1"}));
        store.seed("sales", json!({"id": "s2", "created_by": "u2"}));

        let rows = store
            .select(
                "sales",
                &[Filter::AnyEq(vec![
                    ("id".to_string(), Value::text("u1")),
                    ("created_by".to_string(), Value::text("u1")),
                ])],
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemStore::new();
        store.fail_table("app_settings");
        assert!(store.select("app_settings", &[], None, None).await.is_err());
        store.clear_failure("app_settings");
        assert!(store.select("app_settings", &[], None, None).await.is_ok());
    }
}
