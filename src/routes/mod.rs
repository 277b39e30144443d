pub mod admin;
pub mod health;

pub use admin::{
    cleanup_expired_deletions, delete_user, deletion_status, list_identities, restore_user,
};
pub use health::health_check;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Assemble the application router (shared by the server and tests)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/admin/delete-user", post(delete_user))
        .route("/admin/restore-user", post(restore_user))
        .route(
            "/admin/cleanup-expired-deletions",
            post(cleanup_expired_deletions),
        )
        .route("/admin/deletion-status/:user_id", get(deletion_status))
        .route("/admin/identities", get(list_identities))
        .with_state(state)
}
