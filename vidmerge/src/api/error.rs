//! API error handling.
//!
//! JSON routes answer with `{ "error": ..., "code": ... }`; the artifact route
//! answers with a plain-text body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::Error;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub plain_text: bool,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            plain_text: false,
        }
    }

    /// Render the body as plain text instead of JSON.
    pub fn as_plain_text(mut self) -> Self {
        self.plain_text = true;
        self
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.plain_text {
            return (self.status, self.message).into_response();
        }
        let body = ApiErrorResponse {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Input(msg) => ApiError::bad_request(msg),
            Error::NotFound(msg) => ApiError::not_found(msg),
            Error::Download(_) => {
                tracing::error!("Download error: {}", err);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DOWNLOAD_ERROR",
                    format!("Failed to process video: {err}"),
                )
            }
            Error::Merge(_) | Error::IncompatibleStreams(_) => {
                tracing::error!("Merge error: {}", err);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MERGE_ERROR",
                    format!("Failed to process video: {err}"),
                )
            }
            _ => {
                tracing::error!("Unexpected error: {}", err);
                ApiError::internal(format!("Failed to process video: {err}"))
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
