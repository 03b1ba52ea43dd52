//! Error types module
//!
//! Unified `AppError` for the gateway with the response metadata the HTTP layer
//! needs: status, the numeric error code contract, a developer message and the
//! bilingual user message envelope.

use serde::Serialize;
use utoipa::ToSchema;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like auth rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Bilingual user-facing message carried in every error envelope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserMessage {
    pub en_us: String,
    pub pt_br: String,
}

impl UserMessage {
    pub fn new(en_us: impl Into<String>, pt_br: impl Into<String>) -> Self {
        Self {
            en_us: en_us.into(),
            pt_br: pt_br.into(),
        }
    }

    pub fn unexpected() -> Self {
        Self::new(
            "Unexpected error, try again later",
            "Erro inesperado, tente novamente mais tarde",
        )
    }
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Numeric error code from the public API contract (101, 103, 3001, ...)
    fn error_code(&self) -> u16;

    /// Developer-facing message
    fn message(&self) -> String;

    /// Bilingual user-facing message
    fn user_message(&self) -> UserMessage;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Nonexistent or invalid Store ID")]
    InvalidStore,

    #[error("Undefined user ID (X-My-ID) or Access Token (X-Access-Token)")]
    MissingCredentials,

    #[error("Unauthorized, invalid X-My-ID and X-Access-Token authentication headers")]
    Unauthorized,

    #[error("Store API error: {0}")]
    AuthUpstream(String),

    #[error("Store API unavailable: {0}")]
    AuthUnavailable(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("CDN write failed: {0}")]
    CdnWrite(String),

    #[error("You are able to call only object methods")]
    MethodForbidden,

    #[error("Invalid method name, not found: {0}")]
    MethodNotFound(String),

    #[error("Request body (method params) must be empty or a valid JSON object")]
    InvalidBody,

    #[error("S3 method error: {0}")]
    S3Method(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidStore => 403,
            AppError::MissingCredentials => 403,
            AppError::Unauthorized => 401,
            AppError::AuthUpstream(_) => 400,
            AppError::AuthUnavailable(_) => 500,
            AppError::UploadRejected(_) => 400,
            AppError::CdnWrite(_) => 400,
            AppError::MethodForbidden => 403,
            AppError::MethodNotFound(_) => 404,
            AppError::InvalidBody => 400,
            AppError::S3Method(_) => 400,
            AppError::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> u16 {
        match self {
            AppError::InvalidStore => 101,
            AppError::MissingCredentials => 102,
            AppError::Unauthorized => 103,
            AppError::AuthUpstream(_) => 104,
            AppError::AuthUnavailable(_) => 105,
            AppError::UploadRejected(_) => 3001,
            AppError::CdnWrite(_) => 3002,
            AppError::MethodForbidden => 3011,
            AppError::MethodNotFound(_) => 3012,
            AppError::InvalidBody => 3013,
            AppError::S3Method(_) => 3019,
            AppError::Internal(_) => 500,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }

    fn user_message(&self) -> UserMessage {
        match self {
            AppError::InvalidStore | AppError::MissingCredentials | AppError::Unauthorized => {
                UserMessage::new(
                    "No authorization for the requested resource",
                    "Sem autorização para o recurso solicitado",
                )
            }
            AppError::UploadRejected(_) => UserMessage::new(
                "This file cannot be uploaded, make sure it is a valid image with up to 2mb",
                "O arquivo não pôde ser carregado, verifique se é uma imagem válida com até 2mb",
            ),
            AppError::CdnWrite(_) => UserMessage::new(
                "This file cannot be uploaded to CDN",
                "O arquivo não pôde ser carregado para o CDN",
            ),
            _ => UserMessage::unexpected(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidStore
            | AppError::MissingCredentials
            | AppError::Unauthorized
            | AppError::InvalidBody
            | AppError::MethodForbidden
            | AppError::MethodNotFound(_)
            | AppError::UploadRejected(_) => LogLevel::Debug,
            AppError::AuthUpstream(_) | AppError::S3Method(_) => LogLevel::Warn,
            AppError::AuthUnavailable(_) | AppError::CdnWrite(_) | AppError::Internal(_) => {
                LogLevel::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_use_contract_codes() {
        assert_eq!(AppError::InvalidStore.error_code(), 101);
        assert_eq!(AppError::InvalidStore.http_status_code(), 403);
        assert_eq!(AppError::MissingCredentials.error_code(), 102);
        assert_eq!(AppError::Unauthorized.error_code(), 103);
        assert_eq!(AppError::Unauthorized.http_status_code(), 401);
        assert_eq!(AppError::AuthUpstream("boom".into()).error_code(), 104);
        assert_eq!(AppError::AuthUnavailable("down".into()).error_code(), 105);
    }

    #[test]
    fn upload_and_s3_errors_use_contract_codes() {
        assert_eq!(AppError::UploadRejected("too big".into()).error_code(), 3001);
        assert_eq!(AppError::CdnWrite("put failed".into()).error_code(), 3002);
        assert_eq!(AppError::MethodForbidden.error_code(), 3011);
        assert_eq!(AppError::MethodNotFound("x".into()).error_code(), 3012);
        assert_eq!(AppError::InvalidBody.error_code(), 3013);
        assert_eq!(AppError::S3Method("denied".into()).error_code(), 3019);
    }

    #[test]
    fn user_messages_are_bilingual() {
        let msg = AppError::UploadRejected("x".into()).user_message();
        assert!(msg.en_us.contains("cannot be uploaded"));
        assert!(msg.pt_br.contains("não pôde"));
        let fallback = AppError::Internal("x".into()).user_message();
        assert_eq!(fallback.en_us, "Unexpected error, try again later");
    }
}
