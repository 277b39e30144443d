//! End-to-end tests for the tenant merge engine over the in-memory store.

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

use pos_integrity_server::merge::{MergeEngine, NormalizerConfig};
use pos_integrity_server::store::tables::TENANT_REFERENCE_PROBES_V1;
use pos_integrity_server::store::{Filter, MemStore, RowStore, Value};
use pos_integrity_server::validate::scan_references;

fn seed_tenant(store: &MemStore, id: &str, name: &str, created_offset_secs: i64) {
    let created_at = Utc::now() + Duration::seconds(created_offset_secs);
    store.seed(
        "tenants",
        json!({"id": id, "name": name, "created_at": created_at.to_rfc3339()}),
    );
}

/// The classic duplicate group: three spellings of the same business
fn seed_acme_group(store: &MemStore) {
    seed_tenant(store, "1", "Acme Pos", 0);
    seed_tenant(store, "2", "acme", 10);
    seed_tenant(store, "3", "Acme's Company", 20);

    store.seed(
        "tenant_memberships",
        json!({"id": "m1", "tenant_id": "2", "user_id": "u1", "role": "owner"}),
    );
    store.seed(
        "tenant_memberships",
        json!({"id": "m2", "tenant_id": "3", "user_id": "u2", "role": "staff"}),
    );
    store.seed("app_settings", json!({"id": "as1", "tenant_id": "3"}));
    store.seed(
        "user_profiles",
        json!({"id": "u1", "email": "u1@example.com", "tenant_id": "2"}),
    );
}

fn engine(store: &Arc<MemStore>) -> MergeEngine {
    MergeEngine::new(store.clone(), NormalizerConfig::default(), 4)
}

async fn tenant_ids(store: &MemStore) -> Vec<String> {
    store
        .select("tenants", &[], None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_merge_rewrites_references_and_removes_duplicates() {
    let store = Arc::new(MemStore::new());
    seed_acme_group(&store);

    let report = engine(&store).run_pass().await.unwrap();

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.normalized_name, "Acme");
    assert_eq!(group.keeper_id, "1");
    assert_eq!(group.removed, vec!["2", "3"]);
    assert!(group.failed.is_empty());

    // Only the keeper survives, renamed to the canonical form
    let tenants = store.select("tenants", &[], None, None).await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0]["id"], "1");
    assert_eq!(tenants[0]["name"], "Acme");

    // Every membership that pointed at 2 or 3 now points at 1
    let memberships = store
        .select("tenant_memberships", &[], None, None)
        .await
        .unwrap();
    assert!(memberships.iter().all(|m| m["tenant_id"] == "1"));

    // Zero residual references to the removed duplicates
    for removed_id in ["2", "3"] {
        let scan = scan_references(store.as_ref(), removed_id, TENANT_REFERENCE_PROBES_V1).await;
        assert!(scan.is_clean(), "residual references to {removed_id}");
    }
}

#[tokio::test]
async fn test_merge_pass_is_idempotent() {
    let store = Arc::new(MemStore::new());
    seed_acme_group(&store);

    let first = engine(&store).run_pass().await.unwrap();
    assert_eq!(first.removed_count(), 2);
    let tenants_after_first = tenant_ids(&store).await;

    // Second pass finds one canonical single-member group and does nothing
    let second = engine(&store).run_pass().await.unwrap();
    assert_eq!(second.removed_count(), 0);
    assert_eq!(second.renamed_count(), 0);
    assert!(second.groups.is_empty());
    assert_eq!(tenant_ids(&store).await, tenants_after_first);
}

#[tokio::test]
async fn test_partial_rewrite_failure_preserves_duplicate() {
    let store = Arc::new(MemStore::new());
    seed_acme_group(&store);
    store.fail_table("app_settings");

    let report = engine(&store).run_pass().await.unwrap();
    let group = &report.groups[0];
    assert!(group.removed.is_empty());
    assert_eq!(group.failed.len(), 2);

    // Duplicates are preserved until their rewrite fully succeeds
    let tenants = store.select("tenants", &[], None, None).await.unwrap();
    assert_eq!(tenants.len(), 3);

    // The reachable tables were rewritten anyway; the retry only has the
    // failed table left to do
    let memberships = store
        .select("tenant_memberships", &[], None, None)
        .await
        .unwrap();
    assert!(memberships.iter().all(|m| m["tenant_id"] == "1"));

    // After the table recovers, the next pass completes the merge
    store.clear_failure("app_settings");
    let retry = engine(&store).run_pass().await.unwrap();
    assert_eq!(retry.removed_count(), 2);
    assert_eq!(tenant_ids(&store).await, vec!["1"]);

    let scan = scan_references(store.as_ref(), "3", TENANT_REFERENCE_PROBES_V1).await;
    assert!(scan.is_clean());
}

#[tokio::test]
async fn test_singleton_is_renamed_without_structural_change() {
    let store = Arc::new(MemStore::new());
    seed_tenant(&store, "1", "joe's company", 0);

    let report = engine(&store).run_pass().await.unwrap();
    assert_eq!(report.groups.len(), 1);
    assert!(report.groups[0].renamed);
    assert!(report.groups[0].removed.is_empty());

    let tenants = store.select("tenants", &[], None, None).await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0]["name"], "Joe");
}

#[tokio::test]
async fn test_empty_normalized_name_is_left_alone() {
    let store = Arc::new(MemStore::new());
    // Normalizes to empty: boilerplate token only
    seed_tenant(&store, "1", "Pos", 0);

    let report = engine(&store).run_pass().await.unwrap();
    assert!(report.groups.is_empty());

    let tenants = store.select("tenants", &[], None, None).await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0]["name"], "Pos");
}

#[tokio::test]
async fn test_dry_run_plan_writes_nothing() {
    let store = Arc::new(MemStore::new());
    seed_acme_group(&store);

    let plan = engine(&store).plan().await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].keeper.id, "1");
    assert_eq!(plan[0].duplicates.len(), 2);

    // Nothing changed
    assert_eq!(tenant_ids(&store).await.len(), 3);
    let memberships = store
        .select(
            "tenant_memberships",
            &[Filter::eq("tenant_id", Value::text("2"))],
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
}

#[tokio::test]
async fn test_independent_groups_merge_in_one_pass() {
    let store = Arc::new(MemStore::new());
    seed_acme_group(&store);
    seed_tenant(&store, "7", "Bluebird Pos", 0);
    seed_tenant(&store, "8", "bluebird", 5);

    let report = engine(&store).run_pass().await.unwrap();
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.removed_count(), 3);

    let mut remaining = tenant_ids(&store).await;
    remaining.sort();
    assert_eq!(remaining, vec!["1", "7"]);
}
