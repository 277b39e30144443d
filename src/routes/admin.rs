use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::constants::{ADMIN_SECRET_HEADER, ERR_EMPTY_USER_ID};
use crate::error::{AppError, Result};
use crate::identity::IdentityProvider;
use crate::retention::{self, DeleteOutcome};
use crate::store::tables::USER_PROFILES;
use crate::store::{Filter, RowStore, Value};
use crate::AppState;

/// All administrative endpoints require the shared secret header;
/// absent or incorrect yields 401
fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<()> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(state.config.admin_secret_key.as_str()) {
        tracing::warn!("admin request with missing or invalid secret");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn validated_user_id(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(ERR_EMPTY_USER_ID.to_string()));
    }
    Ok(trimmed)
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: Option<String>,
    /// Skip the retention window and remove rows + identity synchronously
    #[serde(default)]
    pub immediate: bool,
}

/// Delete a user account
///
/// Soft mode (default) purges the user's rows, records the deletion with
/// its cleanup deadline, and leaves the identity restorable until the
/// retention window closes. Immediate mode performs the full, final
/// sequence right away.
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<Json<JsonValue>> {
    require_admin(&headers, &state)?;
    let user_id = validated_user_id(&payload.user_id)?;

    let outcome = retention::delete_user(
        state.store.as_ref(),
        state.identity.as_ref(),
        user_id,
        payload.email,
        payload.immediate,
        state.config.retention_days,
    )
    .await?;

    match outcome {
        DeleteOutcome::Immediate => Ok(Json(json!({ "ok": true }))),
        DeleteOutcome::Scheduled {
            deletion_id,
            retention_days,
            already_pending,
        } => {
            let message = if already_pending {
                "Deletion already pending; existing cleanup deadline unchanged"
            } else {
                "Account scheduled for permanent cleanup after the retention window"
            };
            Ok(Json(json!({
                "ok": true,
                "deletion_id": deletion_id,
                "retention_days": retention_days,
                "message": message,
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RestoreUserRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Restore a soft-deleted account before its cleanup deadline
pub async fn restore_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RestoreUserRequest>,
) -> Result<Json<JsonValue>> {
    require_admin(&headers, &state)?;
    let user_id = validated_user_id(&payload.user_id)?;

    let outcome = retention::restore_user(state.store.as_ref(), user_id).await?;

    Ok(Json(json!({
        "ok": true,
        "message": "Account restored",
        "days_remaining_before_restore": outcome.days_remaining,
    })))
}

/// Run the retention sweep now (same logic as the scheduled run)
pub async fn cleanup_expired_deletions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>> {
    require_admin(&headers, &state)?;

    let report = state.sweeper.run_now().await?;

    Ok(Json(json!({
        "ok": true,
        "database_cleanup_count": report.database_cleanup_count,
        "auth_cleanup_count": report.auth_cleanup_count,
        "auth_cleanup_errors": report.auth_cleanup_errors,
        "store_cleanup_errors": report.store_cleanup_errors,
        "total_processed": report.total_processed,
    })))
}

/// Projection of the most recent deletion record for a user
pub async fn deletion_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<JsonValue>> {
    require_admin(&headers, &state)?;
    let user_id = validated_user_id(&user_id)?;

    let record = retention::latest_record(state.store.as_ref(), user_id)
        .await?
        .ok_or(AppError::DeletionNotFound)?;

    Ok(Json(json!({
        "id": record.id,
        "user_id": record.user_id,
        "email": record.email,
        "deleted_at": record.deleted_at,
        "scheduled_cleanup_at": record.scheduled_cleanup_at,
        "cleanup_completed": record.cleanup_completed,
        "cleanup_completed_at": record.cleanup_completed_at,
        "restored_at": record.restored_at,
        "status": record.status(),
    })))
}

/// List identity-provider users with whether a profile row still exists
/// for each (reconciliation view for the inconsistency window)
pub async fn list_identities(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>> {
    require_admin(&headers, &state)?;

    let identities = state.identity.list_identities().await?;
    let mut entries = Vec::with_capacity(identities.len());
    for identity in identities {
        let rows = state
            .store
            .select(
                USER_PROFILES,
                &[Filter::eq("id", Value::text(identity.id.as_str()))],
                None,
                Some(1),
            )
            .await?;
        entries.push(json!({
            "id": identity.id,
            "email": identity.email,
            "has_profile": !rows.is_empty(),
        }));
    }

    Ok(Json(json!({ "users": entries })))
}
