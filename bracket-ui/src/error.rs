//! Error types for bracket-ui
//!
//! Maps the shared error taxonomy onto HTTP status codes. Rejected
//! selections and out-of-phase events are the user's to fix (4xx); a failed
//! round write is 503 so the client knows retrying the advance is safe.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bracket_common::Error as BracketError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown or expired session (404)
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// Request body or path could not be parsed (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Error raised by the bracket core
    #[error(transparent)]
    Bracket(#[from] BracketError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Bracket(err) => match err {
                BracketError::Selection(_) => (StatusCode::BAD_REQUEST, "SELECTION_REJECTED"),
                BracketError::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
                BracketError::Persistence(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_FAILED")
                }
                BracketError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                BracketError::InvalidInput(_)
                | BracketError::Database(_)
                | BracketError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("{}: {}", code, self);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
