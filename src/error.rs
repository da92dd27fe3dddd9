//! Application error types and handling.
//!
//! Provides structured error responses for the API.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Login credentials rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request lacks a valid session.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (missing or ill-formed field).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource already exists (duplicate username, target file taken).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The external download/extraction step failed.
    #[error("Download error: {0}")]
    Download(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Download(_) => "DOWNLOAD_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Create an unauthorized error for invalid credentials.
    pub fn invalid_credentials() -> Self {
        Self::Unauthorized("Invalid username or password".to_string())
    }

    /// Create a forbidden error for requests without a valid session.
    pub fn login_required() -> Self {
        Self::Forbidden("Login required".to_string())
    }

    /// Create a validation error for a missing request field.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation(format!("Field '{}' is required", field))
    }

    /// Create a conflict error for an already-taken target filename.
    pub fn file_exists(filename: &str) -> Self {
        Self::Conflict(format!(
            "File '{}' already exists, choose another name",
            filename
        ))
    }

    /// Create a validation error for path traversal attempt.
    pub fn path_traversal() -> Self {
        Self::Validation("Invalid filename: path traversal not allowed".to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            // Duplicate-name conflicts surface as plain bad requests on this
            // API, same as field validation failures.
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Download(_) | Self::Internal(_) | Self::Io(_) | Self::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ErrorResponse::new(self.error_code(), self.to_string());

        tracing::error!(
            error_code = %self.error_code(),
            status = %status.as_u16(),
            message = %self.to_string(),
            "API error"
        );

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
