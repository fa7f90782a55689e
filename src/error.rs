//! Application error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Aggregator answered with a non-2xx status (or could not be reached).
    /// Status and body are kept verbatim for the caller.
    #[error("Upstream error ({status}): {body}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build an upstream error from a raw response body.
    ///
    /// Structured bodies are kept as JSON, anything else as a JSON string.
    pub fn upstream(status: u16, text: &str) -> Self {
        let body = serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string()));
        AppError::Upstream { status, body }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Transport failures never reach the aggregator's error body, so they are
/// reported as gateway errors carrying the client's diagnostic.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let status = if err.is_timeout() { 504 } else { 502 };
        AppError::Upstream {
            status,
            body: serde_json::json!({ "detail": err.to_string() }),
        }
    }
}

/// Serializable error response for API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Encryption(_) => "ENCRYPTION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            AppError::Upstream { body, .. } => (status, Json(body)).into_response(),
            other => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", other);
                }
                (status, Json(ErrorResponse::from(&other))).into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
