//! Error types for clipscore-ev HTTP handlers

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
    /// Missing or malformed caller identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// clipscore-common error, mapped by variant
    #[error(transparent)]
    Common(#[from] clipscore_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use clipscore_common::Error as E;

        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                E::SessionState(_) => (StatusCode::CONFLICT, "SESSION_STATE"),
                E::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
                E::Database(_) if err.is_transient() => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_ERROR")
                }
                E::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
                E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                E::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                E::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = match &self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Common(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

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
