use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::services::assets::AssetError;
use crate::services::lifecycle::JobError;

/// Error type for HTTP handlers.
///
/// Wraps the domain errors and renders them as `{ "error", "code" }` JSON
/// with a matching status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Invalid request: {0}")]
    Validation(#[from] garde::Report),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Client-facing message. A multipart stream cut off by the body limit
    /// only reports a generic parse error, so that case is reworded.
    fn message(&self) -> String {
        match self {
            AppError::Multipart(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "Upload exceeds the maximum allowed size".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Job(err) => match err {
                JobError::InvalidReference { .. } => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
                JobError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                JobError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                JobError::NotReady { .. } => (StatusCode::CONFLICT, "NOT_READY"),
                JobError::InvalidTransition { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_TRANSITION")
                }
                // Webhook turns this into an acknowledgement; reaching here
                // means some other path surfaced it.
                JobError::AlreadyTerminal { .. } => (StatusCode::CONFLICT, "ALREADY_TERMINAL"),
            },
            AppError::Asset(err) => match err {
                AssetError::Empty => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                AssetError::PayloadTooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
                }
                AssetError::UnsupportedType(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_TYPE")
                }
                AssetError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Multipart(err) => match err.status() {
                StatusCode::PAYLOAD_TOO_LARGE => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
                }
                _ => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            },
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        };

        if status.is_client_error() {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        let body = json!({
            "error": self.message(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
