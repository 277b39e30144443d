use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::identity::{IdentityDeletion, IdentityProvider};
use crate::models::DeletionRecord;
use crate::store::tables::DELETION_RECORDS;
use crate::store::{Filter, Order, RowStore, StoreError, Value};

/// Aggregate result of one sweep run
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Deletion records marked cleanup-completed
    pub database_cleanup_count: u64,
    /// Identities actually removed from the provider
    pub auth_cleanup_count: u64,
    /// Per-user identity-deletion failures; these records stay active
    /// and are retried on the next run
    pub auth_cleanup_errors: Vec<String>,
    /// Per-user store failures while marking completion
    pub store_cleanup_errors: Vec<String>,
    /// Records examined this run
    pub total_processed: u64,
}

enum Finalized {
    Completed { auth_deleted: bool },
    AuthFailed(String),
    StoreFailed(String),
    LostRace,
}

async fn finalize_record(
    store: &dyn RowStore,
    identity: &dyn IdentityProvider,
    record: &DeletionRecord,
) -> Finalized {
    let auth_deleted = match identity.delete_identity(&record.user_id).await {
        Ok(IdentityDeletion::Deleted) => true,
        Ok(IdentityDeletion::AlreadyAbsent) => {
            tracing::info!(user = %record.user_id, "identity already absent, treating as deleted");
            false
        }
        Err(e) => {
            tracing::error!(
                user = %record.user_id,
                step = "identity-delete",
                error = %e,
                "sweep could not delete identity, record stays pending"
            );
            return Finalized::AuthFailed(format!("{}: {e}", record.user_id));
        }
    };

    // Conditional on the record still being active so a concurrent
    // restore and this completion cannot both win.
    let now = Utc::now();
    let marked = store
        .update(
            DELETION_RECORDS,
            &[
                ("cleanup_completed", Value::Bool(true)),
                ("cleanup_completed_at", Value::Timestamp(now)),
            ],
            &[
                Filter::eq("id", Value::text(record.id.as_str())),
                Filter::eq("cleanup_completed", Value::Bool(false)),
                Filter::is_null("restored_at"),
            ],
        )
        .await;

    match marked {
        Ok(0) => {
            tracing::warn!(
                user = %record.user_id,
                deletion = %record.id,
                "record no longer active, skipping completion"
            );
            Finalized::LostRace
        }
        Ok(_) => {
            tracing::info!(
                user = %record.user_id,
                deletion = %record.id,
                "deletion cleanup finalized"
            );
            Finalized::Completed { auth_deleted }
        }
        Err(e) => {
            // Identity may already be gone; the next run sees
            // AlreadyAbsent and closes the record then.
            tracing::error!(
                user = %record.user_id,
                step = "mark-complete",
                error = %e,
                "failed to mark cleanup complete"
            );
            Finalized::StoreFailed(format!("{}: {e}", record.user_id))
        }
    }
}

/// Finalize every deletion record past its deadline.
///
/// Users are independent: one user's failure is collected and reported
/// without stopping the rest of the sweep. Re-running after everything is
/// finalized performs zero mutations.
pub async fn run_sweep(
    store: &dyn RowStore,
    identity: &dyn IdentityProvider,
    concurrency: usize,
) -> std::result::Result<SweepReport, StoreError> {
    let now = Utc::now();
    let rows = store
        .select(
            DELETION_RECORDS,
            &[
                Filter::eq("cleanup_completed", Value::Bool(false)),
                Filter::is_null("restored_at"),
                Filter::lte("scheduled_cleanup_at", Value::Timestamp(now)),
            ],
            Some(Order::asc("scheduled_cleanup_at")),
            None,
        )
        .await?;

    let mut report = SweepReport {
        total_processed: rows.len() as u64,
        ..SweepReport::default()
    };

    let mut due = Vec::new();
    for row in rows {
        match serde_json::from_value::<DeletionRecord>(row) {
            Ok(record) => due.push(record),
            Err(e) => {
                tracing::error!(error = %e, "skipping undecodable deletion record");
                report
                    .store_cleanup_errors
                    .push(format!("decode failure: {e}"));
            }
        }
    }

    if due.is_empty() {
        tracing::debug!("sweep found no expired deletions");
        return Ok(report);
    }
    tracing::info!(due = due.len(), "sweep processing expired deletions");

    let outcomes = futures::stream::iter(
        due.into_iter()
            .map(|record| async move { finalize_record(store, identity, &record).await }),
    )
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    for outcome in outcomes {
        match outcome {
            Finalized::Completed { auth_deleted } => {
                report.database_cleanup_count += 1;
                if auth_deleted {
                    report.auth_cleanup_count += 1;
                }
            }
            Finalized::AuthFailed(message) => report.auth_cleanup_errors.push(message),
            Finalized::StoreFailed(message) => report.store_cleanup_errors.push(message),
            Finalized::LostRace => {}
        }
    }

    Ok(report)
}

/// Owns the periodic sweep.
///
/// A single instance guarantees at most one sweep runs at a time; a
/// re-entrant `run_now` while one is in progress is a no-op, not queued.
pub struct SweepScheduler {
    store: Arc<dyn RowStore>,
    identity: Arc<dyn IdentityProvider>,
    interval: Duration,
    startup_delay: Duration,
    concurrency: usize,
    running: tokio::sync::Mutex<()>,
}

impl SweepScheduler {
    pub fn new(
        store: Arc<dyn RowStore>,
        identity: Arc<dyn IdentityProvider>,
        interval: Duration,
        startup_delay: Duration,
        concurrency: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            identity,
            interval,
            startup_delay,
            concurrency,
            running: tokio::sync::Mutex::new(()),
        })
    }

    /// Run a sweep immediately (manual/administrative entry point; the
    /// scheduled ticks use the identical logic)
    pub async fn run_now(&self) -> Result<SweepReport> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::info!("sweep already in progress, skipping");
            return Err(AppError::SweepInProgress);
        };
        run_sweep(self.store.as_ref(), self.identity.as_ref(), self.concurrency)
            .await
            .map_err(AppError::Store)
    }

    /// Spawn the periodic loop: one run shortly after start, then one per
    /// interval. A failed run (store unreachable) is logged and retried
    /// on the next tick rather than crashing the host process.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(scheduler.startup_delay).await;
            loop {
                match scheduler.run_now().await {
                    Ok(report) => {
                        if report.total_processed > 0 {
                            tracing::info!(
                                completed = report.database_cleanup_count,
                                auth_deleted = report.auth_cleanup_count,
                                errors = report.auth_cleanup_errors.len(),
                                "scheduled sweep finished"
                            );
                        }
                    }
                    Err(AppError::SweepInProgress) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "scheduled sweep failed, retrying next tick");
                    }
                }
                tokio::time::sleep(scheduler.interval).await;
            }
        })
    }
}
