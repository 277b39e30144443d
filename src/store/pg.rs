use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

use super::{check_ident, Filter, Order, RowStore, StoreError, Value};

/// Create a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Creating database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Postgres-backed row store.
///
/// SQL is assembled with `QueryBuilder`; every identifier passes
/// `check_ident` before being spliced in, and every value is bound.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(table: &str, err: sqlx::Error) -> StoreError {
    StoreError::Query {
        table: table.to_string(),
        message: err.to_string(),
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Text(s) => {
            qb.push_bind(s.clone());
        }
        Value::Int(i) => {
            qb.push_bind(*i);
        }
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Timestamp(t) => {
            qb.push_bind(*t);
        }
        Value::Json(v) => {
            qb.push_bind(v.clone());
        }
        Value::Null => {
            qb.push("NULL");
        }
    }
}

fn push_assignment(
    qb: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    value: &Value,
) -> Result<(), StoreError> {
    let column = check_ident(column)?;
    qb.push(format!("\"{column}\" = "));
    push_value(qb, value);
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> Result<(), StoreError> {
    if filters.is_empty() {
        return Ok(());
    }
    qb.push(" WHERE ");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        match filter {
            Filter::Eq(column, Value::Null) | Filter::IsNull(column) => {
                let column = check_ident(column)?;
                qb.push(format!("\"{column}\" IS NULL"));
            }
            Filter::Eq(column, value) => {
                let column = check_ident(column)?;
                qb.push(format!("\"{column}\" = "));
                push_value(qb, value);
            }
            Filter::Lte(column, value) => {
                let column = check_ident(column)?;
                qb.push(format!("\"{column}\" <= "));
                push_value(qb, value);
            }
            Filter::AnyEq(pairs) => {
                if pairs.is_empty() {
                    qb.push("FALSE");
                    continue;
                }
                qb.push("(");
                for (j, (column, value)) in pairs.iter().enumerate() {
                    if j > 0 {
                        qb.push(" OR ");
                    }
                    let column = check_ident(column)?;
                    qb.push(format!("\"{column}\" = "));
                    push_value(qb, value);
                }
                qb.push(")");
            }
        }
    }
    Ok(())
}

#[async_trait]
impl RowStore for PgStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<Order>,
        limit: Option<i64>,
    ) -> Result<Vec<JsonValue>, StoreError> {
        let table = check_ident(table)?;
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT row_to_json(t) FROM \"{table}\" AS t"));
        push_filters(&mut qb, filters)?;
        if let Some(order) = order {
            let column = check_ident(&order.column)?;
            let direction = if order.descending { "DESC" } else { "ASC" };
            qb.push(format!(" ORDER BY \"{column}\" {direction}"));
        }
        if let Some(limit) = limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(table, e))?;

        rows.into_iter()
            .map(|row| row.try_get::<JsonValue, _>(0).map_err(|e| query_error(table, e)))
            .collect()
    }

    async fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<(), StoreError> {
        let table = check_ident(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO \"{table}\" ("));
        for (i, (column, _)) in row.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            let column = check_ident(column)?;
            qb.push(format!("\"{column}\""));
        }
        qb.push(") VALUES (");
        for (i, (_, value)) in row.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(")");

        qb.build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(table, e))?;
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        set: &[(&str, Value)],
        filters: &[Filter],
    ) -> Result<u64, StoreError> {
        let table = check_ident(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE \"{table}\" SET "));
        for (i, (column, value)) in set.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_assignment(&mut qb, column, value)?;
        }
        push_filters(&mut qb, filters)?;

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(table, e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let table = check_ident(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM \"{table}\""));
        push_filters(&mut qb, filters)?;

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(table, e))?;
        Ok(result.rows_affected())
    }

    async fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        row: &[(&str, Value)],
    ) -> Result<(), StoreError> {
        let table = check_ident(table)?;
        let conflict_key = check_ident(conflict_key)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO \"{table}\" ("));
        for (i, (column, _)) in row.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            let column = check_ident(column)?;
            qb.push(format!("\"{column}\""));
        }
        qb.push(") VALUES (");
        for (i, (_, value)) in row.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(format!(") ON CONFLICT (\"{conflict_key}\") DO UPDATE SET "));
        let mut first = true;
        for (column, _) in row.iter().filter(|(c, _)| *c != conflict_key) {
            if !first {
                qb.push(", ");
            }
            first = false;
            let column = check_ident(column)?;
            qb.push(format!("\"{column}\" = EXCLUDED.\"{column}\""));
        }
        if first {
            // Row is nothing but the conflict key; make the upsert a no-op.
            qb.push(format!("\"{conflict_key}\" = EXCLUDED.\"{conflict_key}\""));
        }

        qb.build()
            .execute(&self.pool)
            .await
            .map_err(|e| query_error(table, e))?;
        Ok(())
    }
}
