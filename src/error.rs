//! Error taxonomy for storage and access operations
//!
//! Cleanup failures never appear here: directory and folder pruning swallow
//! their errors locally and log instead. Path-escape rejections also never
//! surface as errors; callers observe a not-found style outcome.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Errors surfaced by upload, delete and serve operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller-supplied directory hint sanitized to nothing under strict mode
    #[error("Directory hint is empty after sanitization")]
    InvalidDirectoryHint,

    /// The payload exceeded the configured size limit
    #[error("Payload of {size} bytes exceeds the configured limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// A descriptor field was missing or malformed
    #[error("Invalid file descriptor: {0}")]
    InvalidDescriptor(String),

    /// Read access to a private object was denied
    #[error("Access denied")]
    AccessDenied,

    /// Folder store failure outside of advisory cleanup
    #[error("Folder store error: {0}")]
    Folder(String),

    /// Filesystem failure unrelated to path confinement, propagated unmodified
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::InvalidDirectoryHint => StatusCode::BAD_REQUEST,
            StoreError::InvalidDescriptor(_) => StatusCode::BAD_REQUEST,
            StoreError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StoreError::AccessDenied => StatusCode::FORBIDDEN,
            StoreError::Folder(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
