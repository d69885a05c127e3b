//! Error types for opsd-recon HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Already handled by another channel (409)
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// opsd-common error
    #[error(transparent)]
    Common(opsd_common::Error),
}

impl From<opsd_common::Error> for ApiError {
    fn from(err: opsd_common::Error) -> Self {
        use opsd_common::Error;
        // Lift the discriminable taxonomy into the matching HTTP class; the
        // rest stays a generic 500
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::AlreadyResolved(msg) => ApiError::AlreadyResolved(msg),
            Error::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Common(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::AlreadyResolved(msg) => {
                // Distinct from NOT_FOUND: the caller is looking at stale
                // state, the item was handled through another channel
                (StatusCode::CONFLICT, "ALREADY_RESOLVED", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
