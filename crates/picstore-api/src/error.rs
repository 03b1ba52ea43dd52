//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; `AppError`
//! values convert with `?` and render as the numeric-code envelope every
//! endpoint shares.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use picstore_core::{AppError, ErrorMetadata, LogLevel, UserMessage};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status, repeated in the body.
    pub status: u16,
    /// Stable numeric code for programmatic handling.
    pub error_code: u16,
    /// Developer-facing detail.
    pub message: String,
    pub user_message: UserMessage,
}

/// Wrapper for AppError to implement IntoResponse, which the orphan rule
/// forbids on the picstore-core type directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = self.0;
        let status = error.http_status_code();
        let body = ErrorResponse {
            status,
            error_code: error.error_code(),
            message: error.message(),
            user_message: error.user_message(),
        };

        match error.log_level() {
            LogLevel::Debug => {
                tracing::debug!(error_code = body.error_code, message = %body.message, "request failed")
            }
            LogLevel::Warn => {
                tracing::warn!(error_code = body.error_code, message = %body.message, "request failed")
            }
            LogLevel::Error => {
                tracing::error!(error_code = body.error_code, message = %body.message, "request failed")
            }
        }

        let status =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
