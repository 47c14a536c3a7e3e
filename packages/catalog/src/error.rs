use common::storage::StorageError;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

/// Structured error body surfaced to callers on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `INVALID_CATEGORY`,
    /// `NOT_FOUND`, `CONFLICT`, `QUOTA_EXCEEDED`, `UNSUPPORTED_MEDIA`,
    /// `PAYLOAD_TOO_LARGE`, `TOKEN_INVALID`, `INTERNAL_ERROR`.
    pub code: &'static str,
    /// Human-readable error description.
    pub message: String,
}

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    /// Category slug did not resolve to an existing category.
    #[error("Unknown category '{0}'")]
    InvalidCategory(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Image limit of {limit} per vehicle reached")]
    QuotaExceeded { limit: u64 },
    #[error("{0}")]
    UnsupportedMedia(String),
    #[error("File exceeds maximum size of {limit} bytes ({actual} bytes)")]
    TooLarge { actual: u64, limit: u64 },
    #[error("Invalid or expired token")]
    Unauthorized,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidCategory(_) => "INVALID_CATEGORY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::UnsupportedMedia(_) => "UNSUPPORTED_MEDIA",
            AppError::TooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::Unauthorized => "TOKEN_INVALID",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status a route layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::InvalidCategory(_) => 400,
            AppError::Unauthorized => 401,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) | AppError::QuotaExceeded { .. } => 409,
            AppError::TooLarge { .. } => 413,
            AppError::UnsupportedMedia(_) => 415,
            AppError::Internal(_) => 500,
        }
    }

    /// Consume the error into its public `{code, message}` pair.
    ///
    /// Internal details are logged here and never returned.
    pub fn into_body(self) -> ErrorBody {
        let code = self.code();
        let message = match self {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody { code, message }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            tracing::warn!("Unique constraint violation: {detail}");
            return AppError::Conflict("Resource already exists".into());
        }
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Internal(format!("image processing failed: {err}"))
    }
}
