//! Error types for the moderation service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error taxonomy. Per-frame errors (storage fetch, analyzer
/// invocation, analyzer parse) are absorbed into degraded terminal
/// verdicts; persistence errors are the only fatal kind.
#[derive(Error, Debug)]
pub enum ModerationError {
    /// A single frame could not be fetched from storage
    #[error("frame fetch failed at {timestamp_seconds}s: {message}")]
    StorageFetch {
        timestamp_seconds: f64,
        message: String,
    },

    /// The analyzer service is not installed/reachable
    #[error("analyzer service not configured: {0}")]
    AnalyzerUnavailable(String),

    /// The analyzer process failed, timed out, or reported an error
    #[error("analyzer invocation failed: {0}")]
    AnalyzerInvocation(String),

    /// The analyzer produced output that is not the expected detection
    /// payload
    #[error("failed to parse analyzer output: {0}")]
    AnalyzerParse(String),

    /// Database error while reading or writing asset records
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Type alias for moderation pipeline results
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Custom error type for the HTTP boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Requested asset does not exist
    #[error("Not found")]
    NotFound,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
