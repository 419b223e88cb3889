//! Unified Error Handling
//!
//! Application-wide error type and JSON response envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Unified API response structure
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Caller Errors ==========
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Member not found: {0}")]
    MemberNotFound(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    // ========== Data / Configuration Errors ==========
    /// Cycle detected while traversing the stored hierarchy. Aborts only
    /// the affected member's computation, never a whole batch.
    #[error("Corrupt hierarchy: cycle detected at member {0}")]
    CorruptHierarchy(i64),

    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    // ========== Settlement Errors ==========
    #[error("Settlement write failure: {0}")]
    SettlementWriteFailure(String),

    // ========== Backpressure ==========
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // ========== System Errors ==========
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "E0002", msg.clone())
            }
            AppError::MemberNotFound(id) => {
                (StatusCode::NOT_FOUND, "E0003", format!("Member {id} not found"))
            }
            AppError::ProductNotFound(id) => {
                (StatusCode::NOT_FOUND, "E0003", format!("Product {id} not found"))
            }
            AppError::ConfigurationConflict(msg) => {
                (StatusCode::CONFLICT, "E0004", msg.clone())
            }
            AppError::CorruptHierarchy(id) => {
                error!(target: "hierarchy", member_id = id, "Cycle detected in stored hierarchy");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9003",
                    "Corrupt hierarchy".to_string(),
                )
            }
            AppError::SettlementWriteFailure(msg) => {
                error!(target: "settlement", error = %msg, "Settlement write failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9004",
                    "Settlement write failure".to_string(),
                )
            }
            AppError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "E4029",
                "Too many requests, try again later".to_string(),
            ),
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

/// Result type for service operations
pub type AppResult<T> = Result<T, AppError>;

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
