use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::store::StoreError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("No deletion record found for user")]
    DeletionNotFound,

    #[error("Account is not restorable: {0}")]
    NotRestorable(String),

    #[error("A sweep is already in progress")]
    SweepInProgress,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Identity(ref e) => {
                tracing::error!("Identity provider error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Identity provider error".to_string(),
                )
            }
            AppError::DeletionNotFound => (
                StatusCode::NOT_FOUND,
                "No deletion record found for user".to_string(),
            ),
            AppError::NotRestorable(reason) => (StatusCode::CONFLICT, reason),
            AppError::SweepInProgress => (
                StatusCode::CONFLICT,
                "A cleanup sweep is already in progress".to_string(),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
