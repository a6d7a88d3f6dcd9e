use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything a handler can fail with, mapped onto the HTTP surface by
/// `IntoResponse`. External-service failures stay unclassified beyond
/// "something failed" except for the two states a caller can act on:
/// remote processing reported FAILED, and the bounded poll ran out.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("file processing failed with state: {0}")]
    ProcessingFailed(String),

    #[error("timed out waiting for video processing")]
    ProcessingTimeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ProcessingTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::ProcessingFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::Internal(err) => format!("{err:#}"),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!("request failed: {message}");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
