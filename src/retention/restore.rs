use chrono::Utc;

use crate::constants::{ERR_ALREADY_CLEANED_UP, ERR_DEADLINE_PASSED};
use crate::error::{AppError, Result};
use crate::store::tables::{DELETION_RECORDS, USER_PROFILES};
use crate::store::{Filter, RowStore, Value};

use super::purge::latest_record;

/// Result of a successful restore, for audit/telemetry
#[derive(Debug)]
pub struct RestoreOutcome {
    /// Days that were left in the retention window at restore time
    pub days_remaining: i64,
}

/// Reverse a pending deletion before its deadline.
///
/// The identity record still exists while the deletion is pending, so a
/// restore only has to close the deletion record and recreate the
/// minimal profile row the application needs.
///
/// The sweep may be finalizing the same record concurrently; the
/// conditional update below and the sweep's completion write are both
/// gated on the record still being active, so exactly one of the two
/// wins and the loser reports accordingly.
pub async fn restore_user(store: &dyn RowStore, user_id: &str) -> Result<RestoreOutcome> {
    let record = latest_record(store, user_id)
        .await?
        .ok_or(AppError::DeletionNotFound)?;

    if record.cleanup_completed {
        return Err(AppError::NotRestorable(ERR_ALREADY_CLEANED_UP.to_string()));
    }
    if record.restored_at.is_some() {
        // Already restored; there is no pending deletion to reverse
        return Err(AppError::DeletionNotFound);
    }

    let now = Utc::now();
    if now >= record.scheduled_cleanup_at {
        return Err(AppError::NotRestorable(ERR_DEADLINE_PASSED.to_string()));
    }

    // Minimal profile re-linkage, before the record transitions: if this
    // fails the record is still active and the restore is simply retried.
    store
        .upsert(
            USER_PROFILES,
            "id",
            &[
                ("id", Value::text(user_id)),
                (
                    "email",
                    record
                        .email
                        .as_deref()
                        .map(Value::text)
                        .unwrap_or(Value::Null),
                ),
            ],
        )
        .await?;

    let affected = store
        .update(
            DELETION_RECORDS,
            &[("restored_at", Value::Timestamp(now))],
            &[
                Filter::eq("id", Value::text(record.id.as_str())),
                Filter::eq("cleanup_completed", Value::Bool(false)),
                Filter::is_null("restored_at"),
            ],
        )
        .await?;
    if affected == 0 {
        // The sweep won the race and completed cleanup first; take the
        // re-linked row back out so the purge's result stands.
        if let Err(e) = store
            .delete(USER_PROFILES, &[Filter::eq("id", Value::text(user_id))])
            .await
        {
            tracing::error!(
                user = user_id,
                error = %e,
                "could not remove profile row after lost restore race"
            );
        }
        tracing::warn!(user = user_id, deletion = %record.id, "restore lost race against sweep");
        return Err(AppError::NotRestorable(ERR_ALREADY_CLEANED_UP.to_string()));
    }

    let days_remaining = record.days_remaining_at(now);
    tracing::info!(
        user = user_id,
        deletion = %record.id,
        days_remaining,
        "account restored"
    );
    Ok(RestoreOutcome { days_remaining })
}
