//! API error types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use extractor::ExtractError;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// JSON body of every error response
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../web/src/bindings/")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("No matching files in archive")]
    NoMatchingFiles,

    #[error("Missing file field: {0}")]
    MissingUpload(String),

    #[error("Archive too large: {0}")]
    ArchiveTooLarge(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::InvalidArchive(reason) => ApiError::InvalidArchive(reason),
            ExtractError::NoMatchingFiles => ApiError::NoMatchingFiles,
            e @ ExtractError::SizeLimitExceeded { .. } => ApiError::ArchiveTooLarge(e.to_string()),
            ExtractError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidArchive(reason) => {
                tracing::warn!(reason = %reason, "Rejected upload: invalid archive");
                (StatusCode::BAD_REQUEST, "invalid archive")
            }
            ApiError::NoMatchingFiles => {
                tracing::warn!("Rejected upload: no matching files");
                (StatusCode::BAD_REQUEST, "no matching files")
            }
            ApiError::MissingUpload(reason) => {
                tracing::warn!(reason = %reason, "Rejected upload: no file field");
                (StatusCode::BAD_REQUEST, "missing file field")
            }
            ApiError::ArchiveTooLarge(reason) => {
                tracing::warn!(reason = %reason, "Rejected upload: too large");
                (StatusCode::PAYLOAD_TOO_LARGE, "archive too large")
            }
            ApiError::TaskNotFound(id) => {
                tracing::debug!(task_id = %id, "Task not found");
                (StatusCode::NOT_FOUND, "task not found")
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
