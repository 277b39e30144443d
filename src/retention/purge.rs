use chrono::Utc;

use crate::error::{AppError, Result};
use crate::identity::{IdentityDeletion, IdentityProvider};
use crate::models::{DeletionRecord, UserProfile};
use crate::store::tables::{DELETION_RECORDS, USER_OWNED_V1, USER_PROFILES};
use crate::store::{Filter, Order, RowStore, StoreError, Value};

/// Result of a delete-user request
#[derive(Debug)]
pub enum DeleteOutcome {
    /// Soft delete: rows purged, a deletion record holds the cleanup
    /// deadline, the identity stays until the sweep finalizes it
    Scheduled {
        deletion_id: String,
        retention_days: i64,
        already_pending: bool,
    },
    /// Immediate mode: rows and identity removed synchronously
    Immediate,
}

fn decode_record(row: serde_json::Value) -> Result<DeletionRecord> {
    serde_json::from_value(row).map_err(|source| {
        AppError::Store(StoreError::Decode {
            table: DELETION_RECORDS.to_string(),
            source,
        })
    })
}

/// The active (cleanup-not-completed, not restored) deletion record for a
/// user, if one exists. At most one exists by invariant.
pub async fn find_active_record(
    store: &dyn RowStore,
    user_id: &str,
) -> Result<Option<DeletionRecord>> {
    let rows = store
        .select(
            DELETION_RECORDS,
            &[
                Filter::eq("user_id", Value::text(user_id)),
                Filter::eq("cleanup_completed", Value::Bool(false)),
                Filter::is_null("restored_at"),
            ],
            None,
            Some(1),
        )
        .await?;
    rows.into_iter().next().map(decode_record).transpose()
}

/// The most recent deletion record for a user, active or closed
pub async fn latest_record(store: &dyn RowStore, user_id: &str) -> Result<Option<DeletionRecord>> {
    let rows = store
        .select(
            DELETION_RECORDS,
            &[Filter::eq("user_id", Value::text(user_id))],
            Some(Order::desc("deleted_at")),
            Some(1),
        )
        .await?;
    rows.into_iter().next().map(decode_record).transpose()
}

/// Delete every user-owned row, in dependency order: tables with foreign
/// keys into the profile row are cleared before the profile row itself.
/// Re-running after a partial failure is a no-op for the tables already
/// cleared.
async fn purge_user_rows(store: &dyn RowStore, user_id: &str) -> Result<u64> {
    let mut total = 0;
    for owned in USER_OWNED_V1 {
        let deleted = store
            .delete(
                owned.table,
                &[Filter::eq(owned.fk_column, Value::text(user_id))],
            )
            .await?;
        if deleted > 0 {
            tracing::info!(
                table = owned.table,
                rows = deleted,
                user = user_id,
                "purged user-owned rows"
            );
        }
        total += deleted;
    }
    Ok(total)
}

async fn snapshot_email(store: &dyn RowStore, user_id: &str) -> Option<String> {
    let rows = store
        .select(
            USER_PROFILES,
            &[Filter::eq("id", Value::text(user_id))],
            None,
            Some(1),
        )
        .await
        .ok()?;
    let profile: UserProfile = serde_json::from_value(rows.into_iter().next()?).ok()?;
    profile.email
}

/// Execute "delete user X".
///
/// Soft mode (the default) records the deletion with its cleanup deadline
/// and leaves the identity intact so the account stays restorable for the
/// retention window. Immediate mode performs the full sequence
/// synchronously, identity last.
///
/// Calling this again for a user already pending deletion re-runs the row
/// purge (harmless, the rows are gone) and returns the existing record.
pub async fn delete_user(
    store: &dyn RowStore,
    identity: &dyn IdentityProvider,
    user_id: &str,
    email: Option<String>,
    immediate: bool,
    retention_days: i64,
) -> Result<DeleteOutcome> {
    let email = match email {
        Some(email) => Some(email),
        None => snapshot_email(store, user_id).await,
    };

    if immediate {
        purge_user_rows(store, user_id).await?;
        match identity.delete_identity(user_id).await {
            Ok(IdentityDeletion::Deleted) => {
                tracing::info!(user = user_id, "identity deleted (immediate mode)");
            }
            Ok(IdentityDeletion::AlreadyAbsent) => {
                tracing::info!(user = user_id, "identity already absent (immediate mode)");
            }
            Err(e) => {
                // Relational rows are already gone; this inconsistency is
                // surfaced for manual reconciliation, not rolled back.
                tracing::error!(
                    user = user_id,
                    step = "identity-delete",
                    error = %e,
                    "immediate deletion left an orphaned identity"
                );
                return Err(e.into());
            }
        }
        return Ok(DeleteOutcome::Immediate);
    }

    // The record is written before the rows are purged so a failure
    // mid-purge still leaves a deadline for the sweep to finalize.
    if let Some(existing) = find_active_record(store, user_id).await? {
        purge_user_rows(store, user_id).await?;
        tracing::info!(
            user = user_id,
            deletion = %existing.id,
            "deletion already pending, purge re-run"
        );
        return Ok(DeleteOutcome::Scheduled {
            deletion_id: existing.id,
            retention_days,
            already_pending: true,
        });
    }

    let record = DeletionRecord::new(user_id, email, Utc::now(), retention_days);
    store
        .insert(DELETION_RECORDS, &record.to_row())
        .await
        .map_err(AppError::Store)?;
    purge_user_rows(store, user_id).await?;

    tracing::info!(
        user = user_id,
        deletion = %record.id,
        scheduled_cleanup_at = %record.scheduled_cleanup_at,
        "user soft-deleted"
    );
    Ok(DeleteOutcome::Scheduled {
        deletion_id: record.id,
        retention_days,
        already_pending: false,
    })
}
