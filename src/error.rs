//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<crate::audit::AuditLogError> for AppError {
    fn from(err: crate::audit::AuditLogError) -> Self {
        match err {
            crate::audit::AuditLogError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl AppError {
    /// HTTP status and stable machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),

            // 401 Unauthorized
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),

            // 403 Forbidden
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),

            // 404 Not Found
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                DomainError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                DomainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                DomainError::SelfTransfer => (StatusCode::BAD_REQUEST, "self_transfer"),
                DomainError::InsufficientBalance { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_balance")
                }
                DomainError::InvalidOutcome(_) => (StatusCode::BAD_REQUEST, "invalid_status"),
                DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                DomainError::AlreadySettled { .. } => (StatusCode::CONFLICT, "already_settled"),
                DomainError::EmptyPool => (StatusCode::NOT_FOUND, "empty_pool"),
                DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
                DomainError::TransferNotFound(_) => (StatusCode::NOT_FOUND, "transfer_not_found"),
                DomainError::ResultNotFound(_) => (StatusCode::NOT_FOUND, "result_not_found"),
            },

            // 500 Internal Server Error
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Server-side failures are logged in full; callers get a generic message.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
