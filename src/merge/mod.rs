//! Tenant deduplication engine.
//!
//! A merge pass groups tenants by normalized name, picks the
//! earliest-created record of each group as the keeper, rewrites every
//! dependent foreign key from the duplicates to the keeper, and deletes a
//! duplicate only once its rewrite fully succeeded. There is no
//! cross-table transaction underneath, so each step is idempotent and a
//! crashed or failed pass is simply re-run.

pub mod group;
pub mod normalize;
pub mod rewrite;

pub use group::{group_by_normalized, select_keeper};
pub use normalize::{normalize_name, NormalizerConfig};
pub use rewrite::{rewrite_references, RewriteOutcome};

use futures::StreamExt;
use std::sync::Arc;

use crate::models::Tenant;
use crate::store::tables::{DependentTable, TENANTS, TENANT_DEPENDENTS_V1};
use crate::store::{Filter, Order, RowStore, StoreError, Value};

/// A duplicate whose rewrite (or deletion) failed; it stays in the store
/// and the next pass picks it up again
#[derive(Debug)]
pub struct DuplicateFailure {
    pub tenant_id: String,
    pub error: String,
}

/// What happened to one normalized-name group
#[derive(Debug)]
pub struct GroupOutcome {
    pub normalized_name: String,
    pub keeper_id: String,
    pub renamed: bool,
    /// Duplicates confirmed rewritten and deleted
    pub removed: Vec<String>,
    pub failed: Vec<DuplicateFailure>,
}

/// Aggregate result of one merge pass
#[derive(Debug, Default)]
pub struct MergeReport {
    pub groups: Vec<GroupOutcome>,
}

impl MergeReport {
    pub fn removed_count(&self) -> usize {
        self.groups.iter().map(|g| g.removed.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.iter().map(|g| g.failed.len()).sum()
    }

    pub fn renamed_count(&self) -> usize {
        self.groups.iter().filter(|g| g.renamed).count()
    }
}

/// A group as it would be processed, for dry runs
#[derive(Debug)]
pub struct PlannedGroup {
    pub normalized_name: String,
    pub keeper: Tenant,
    pub duplicates: Vec<Tenant>,
}

/// Drives a full merge pass, group by group
pub struct MergeEngine {
    store: Arc<dyn RowStore>,
    normalizer: NormalizerConfig,
    dependents: &'static [DependentTable],
    concurrency: usize,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn RowStore>, normalizer: NormalizerConfig, concurrency: usize) -> Self {
        Self {
            store,
            normalizer,
            dependents: TENANT_DEPENDENTS_V1,
            concurrency: concurrency.max(1),
        }
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let rows = self
            .store
            .select(TENANTS, &[], Some(Order::asc("id")), None)
            .await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|source| StoreError::Decode {
                    table: TENANTS.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Group and select without writing anything
    pub async fn plan(&self) -> Result<Vec<PlannedGroup>, StoreError> {
        let tenants = self.list_tenants().await?;
        let groups = group_by_normalized(&tenants, &self.normalizer);

        let mut planned = Vec::new();
        for (normalized_name, members) in groups {
            let keeper_rename = members.len() == 1 && members[0].name != normalized_name;
            if members.len() == 1 && !keeper_rename {
                continue;
            }
            if let Some((keeper, duplicates)) = select_keeper(members) {
                planned.push(PlannedGroup {
                    normalized_name,
                    keeper,
                    duplicates,
                });
            }
        }
        Ok(planned)
    }

    /// Run a full merge pass. Per-group failures are reported in the
    /// result and never abort the remaining groups; a re-run is always
    /// safe because every step matches zero rows once applied.
    pub async fn run_pass(&self) -> Result<MergeReport, StoreError> {
        let tenants = self.list_tenants().await?;
        let total = tenants.len();
        let groups = group_by_normalized(&tenants, &self.normalizer);
        tracing::info!(
            tenants = total,
            groups = groups.len(),
            "starting tenant merge pass"
        );

        let outcomes = futures::stream::iter(
            groups
                .into_iter()
                .map(|(name, members)| self.process_group(name, members)),
        )
        .buffer_unordered(self.concurrency)
        .collect::<Vec<_>>()
        .await;

        let mut report = MergeReport {
            groups: outcomes.into_iter().flatten().collect(),
        };
        report
            .groups
            .sort_by(|a, b| a.normalized_name.cmp(&b.normalized_name));

        tracing::info!(
            removed = report.removed_count(),
            renamed = report.renamed_count(),
            failed = report.failed_count(),
            "tenant merge pass complete"
        );
        Ok(report)
    }

    /// Process one normalized-name group. Steps within the group are
    /// strictly sequential: a duplicate is deleted only after its rewrite
    /// observably succeeded.
    async fn process_group(
        &self,
        normalized_name: String,
        members: Vec<Tenant>,
    ) -> Option<GroupOutcome> {
        if members.len() == 1 {
            let tenant = &members[0];
            if tenant.name == normalized_name {
                // Already canonical, nothing to do
                return None;
            }
            let renamed = self.rename_tenant(&tenant.id, &normalized_name).await;
            return Some(GroupOutcome {
                normalized_name,
                keeper_id: tenant.id.clone(),
                renamed,
                removed: Vec::new(),
                failed: Vec::new(),
            });
        }

        let (keeper, duplicates) = select_keeper(members)?;
        let renamed = if keeper.name != normalized_name {
            self.rename_tenant(&keeper.id, &normalized_name).await
        } else {
            false
        };

        let mut removed = Vec::new();
        let mut failed = Vec::new();
        for duplicate in duplicates {
            let outcome =
                rewrite_references(self.store.as_ref(), &duplicate.id, &keeper.id, self.dependents)
                    .await;
            if !outcome.fully_succeeded() {
                let tables: Vec<&str> = outcome.failures.iter().map(|f| f.table).collect();
                tracing::warn!(
                    duplicate = %duplicate.id,
                    keeper = %keeper.id,
                    tables = ?tables,
                    "rewrite incomplete, duplicate preserved for next pass"
                );
                failed.push(DuplicateFailure {
                    tenant_id: duplicate.id,
                    error: format!("rewrite failed for tables: {}", tables.join(", ")),
                });
                continue;
            }

            match self
                .store
                .delete(TENANTS, &[Filter::eq("id", Value::text(duplicate.id.as_str()))])
                .await
            {
                Ok(_) => {
                    tracing::info!(
                        duplicate = %duplicate.id,
                        keeper = %keeper.id,
                        name = %normalized_name,
                        "merged duplicate tenant"
                    );
                    removed.push(duplicate.id);
                }
                Err(e) => {
                    tracing::warn!(
                        duplicate = %duplicate.id,
                        error = %e,
                        "rewrite succeeded but delete failed, duplicate preserved"
                    );
                    failed.push(DuplicateFailure {
                        tenant_id: duplicate.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Some(GroupOutcome {
            normalized_name,
            keeper_id: keeper.id,
            renamed,
            removed,
            failed,
        })
    }

    async fn rename_tenant(&self, tenant_id: &str, name: &str) -> bool {
        let result = self
            .store
            .update(
                TENANTS,
                &[("name", Value::text(name))],
                &[Filter::eq("id", Value::text(tenant_id))],
            )
            .await;
        match result {
            Ok(_) => {
                tracing::info!(tenant = tenant_id, name, "renamed tenant to canonical form");
                true
            }
            Err(e) => {
                tracing::warn!(tenant = tenant_id, error = %e, "tenant rename failed");
                false
            }
        }
    }
}
