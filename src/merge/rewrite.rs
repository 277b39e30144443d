use crate::store::tables::DependentTable;
use crate::store::{Filter, RowStore, Value};

/// Per-table result of a rewrite attempt
#[derive(Debug)]
pub struct TableRewrite {
    pub table: &'static str,
    pub rows_updated: u64,
}

#[derive(Debug)]
pub struct TableFailure {
    pub table: &'static str,
    pub error: String,
}

/// Aggregate outcome of rewriting one duplicate's references
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    pub updated: Vec<TableRewrite>,
    pub failures: Vec<TableFailure>,
}

impl RewriteOutcome {
    /// The duplicate may only be deleted when every table succeeded
    pub fn fully_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn rows_updated(&self) -> u64 {
        self.updated.iter().map(|t| t.rows_updated).sum()
    }
}

/// Reassign every row referencing `source_id` to `dest_id` across the
/// dependent-table list.
///
/// Every table is attempted even when an earlier one fails, so a retry
/// only has real work left in the tables that still hold stale
/// references; tables already rewritten match zero rows and the repeated
/// update is a no-op.
pub async fn rewrite_references(
    store: &dyn RowStore,
    source_id: &str,
    dest_id: &str,
    dependents: &[DependentTable],
) -> RewriteOutcome {
    let mut outcome = RewriteOutcome::default();

    for dependent in dependents {
        let result = store
            .update(
                dependent.table,
                &[(dependent.fk_column, Value::text(dest_id))],
                &[Filter::eq(dependent.fk_column, Value::text(source_id))],
            )
            .await;

        match result {
            Ok(rows_updated) => {
                if rows_updated > 0 {
                    tracing::info!(
                        table = dependent.table,
                        rows = rows_updated,
                        source = source_id,
                        dest = dest_id,
                        "reassigned tenant references"
                    );
                }
                outcome.updated.push(TableRewrite {
                    table: dependent.table,
                    rows_updated,
                });
            }
            Err(e) => {
                tracing::warn!(
                    table = dependent.table,
                    source = source_id,
                    error = %e,
                    "failed to reassign tenant references"
                );
                outcome.failures.push(TableFailure {
                    table: dependent.table,
                    error: e.to_string(),
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tables::TENANT_DEPENDENTS_V1;
    use crate::store::MemStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_rewrite_reassigns_all_tables() {
        let store = MemStore::new();
        store.seed(
            "tenant_memberships",
            json!({"id": "m1", "tenant_id": "dup", "user_id": "u1"}),
        );
        store.seed("app_settings", json!({"id": "s1", "tenant_id": "dup"}));
        store.seed(
            "user_profiles",
            json!({"id": "u1", "tenant_id": "dup", "email": null}),
        );

        let outcome = rewrite_references(&store, "dup", "keep", TENANT_DEPENDENTS_V1).await;
        assert!(outcome.fully_succeeded());
        assert_eq!(outcome.rows_updated(), 3);

        let stale = store
            .select(
                "tenant_memberships",
                &[Filter::eq("tenant_id", Value::text("dup"))],
                None,
                None,
            )
            .await
            .unwrap();
        assert!(stale.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let store = MemStore::new();
        store.seed(
            "tenant_memberships",
            json!({"id": "m1", "tenant_id": "dup", "user_id": "u1"}),
        );

        let first = rewrite_references(&store, "dup", "keep", TENANT_DEPENDENTS_V1).await;
        assert_eq!(first.rows_updated(), 1);

        let second = rewrite_references(&store, "dup", "keep", TENANT_DEPENDENTS_V1).await;
        assert!(second.fully_succeeded());
        assert_eq!(second.rows_updated(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_attempts_remaining_tables() {
        let store = MemStore::new();
        store.seed(
            "tenant_memberships",
            json!({"id": "m1", "tenant_id": "dup", "user_id": "u1"}),
        );
        store.seed("subscriptions", json!({"id": "sub1", "tenant_id": "dup"}));
        store.fail_table("app_settings");

        let outcome = rewrite_references(&store, "dup", "keep", TENANT_DEPENDENTS_V1).await;
        assert!(!outcome.fully_succeeded());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].table, "app_settings");
        // The tables after the failing one were still attempted
        assert_eq!(outcome.rows_updated(), 2);
    }
}
