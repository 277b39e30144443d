use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::store::tables::DELETION_RECORDS;
use crate::store::RowStore;
use crate::AppState;

/// Health check endpoint
///
/// Returns the health status of the server and store connection.
/// Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store_status = match state
        .store
        .select(DELETION_RECORDS, &[], None, Some(1))
        .await
    {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Store health check failed: {:?}", e);
            "disconnected"
        }
    };

    Json(json!({
        "status": if store_status == "connected" { "healthy" } else { "unhealthy" },
        "store": store_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
