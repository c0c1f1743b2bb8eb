//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::compose::ComposeError;
use crate::flow::PrintRejected;
use crate::sinks::{PrintError, UploadError};

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("print failed: {0}")]
    PrintFailure(String),

    #[error("upload failed: {0}")]
    UploadFailure(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_name, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", msg),
            ApiError::PrintFailure(msg) => (StatusCode::BAD_GATEWAY, "PrintFailure", msg),
            ApiError::UploadFailure(msg) => (StatusCode::BAD_GATEWAY, "UploadFailure", msg),
            ApiError::InvalidPayload(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidPayload", msg),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    err.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_name,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<PrintRejected> for ApiError {
    fn from(err: PrintRejected) -> Self {
        match err {
            PrintRejected::NoPhoto => ApiError::NotFound(err.to_string()),
            PrintRejected::Busy => ApiError::Conflict(err.to_string()),
            PrintRejected::NoPrinter => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<PrintError> for ApiError {
    fn from(err: PrintError) -> Self {
        ApiError::PrintFailure(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidPayload(msg) => ApiError::InvalidPayload(msg),
            UploadError::Failure(msg) => ApiError::UploadFailure(msg),
        }
    }
}

impl From<ComposeError> for ApiError {
    fn from(err: ComposeError) -> Self {
        ApiError::Internal(err.into())
    }
}
