// ABOUTME: Unified application error type with structured error codes
// ABOUTME: Maps validation, lookup, storage and external-service failures onto one AppError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Shift Sync Contributors

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the workspace
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A value failed validation (for example an unknown status string)
    ValidationFailed,
    /// A table is missing a column the operation requires
    MissingRequiredColumn,
    /// Input from a caller was malformed
    InvalidInput,
    /// A required field was absent
    MissingRequiredField,
    /// The requested resource does not exist
    ResourceNotFound,
    /// A lookup matched more than one record
    AmbiguousMatch,
    /// A downstream HTTP service failed
    ExternalServiceError,
    /// Database operation failed
    DatabaseError,
    /// Configuration is missing or invalid
    ConfigError,
    /// Request signature did not verify
    PermissionDenied,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// Stable string form used in logs and JSON bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::MissingRequiredColumn => "missing_required_column",
            Self::InvalidInput => "invalid_input",
            Self::MissingRequiredField => "missing_required_field",
            Self::ResourceNotFound => "resource_not_found",
            Self::AmbiguousMatch => "ambiguous_match",
            Self::ExternalServiceError => "external_service_error",
            Self::DatabaseError => "database_error",
            Self::ConfigError => "config_error",
            Self::PermissionDenied => "permission_denied",
            Self::InternalError => "internal_error",
        }
    }

    /// HTTP status code associated with this error class
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed | Self::InvalidInput | Self::MissingRequiredField => 400,
            Self::PermissionDenied => 401,
            Self::ResourceNotFound => 404,
            Self::AmbiguousMatch => 409,
            Self::ExternalServiceError => 502,
            Self::MissingRequiredColumn
            | Self::DatabaseError
            | Self::ConfigError
            | Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error carrying a code and a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct AppError {
    /// Error classification
    pub code: ErrorCode,
    /// Description with enough context to diagnose the failure
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Malformed value (status string, month key, cell reference)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// A table does not expose a column the operation needs
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredColumn,
            format!("Table '{table}' is missing required column '{column}'"),
        )
    }

    /// Caller supplied bad input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource lookup failed
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }

    /// Lookup matched multiple records
    pub fn ambiguous(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AmbiguousMatch, message)
    }

    /// Downstream HTTP service failure
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{service}: {}", message.into()),
        )
    }

    /// Database failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Unexpected internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// True when the error is a typed lookup miss rather than a fault
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.code, ErrorCode::ResourceNotFound)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {err}"))
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use serde_json::json;

    use super::AppError;

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.code.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = json!({
                "error": self.code.as_str(),
                "message": self.message,
            });
            (status, Json(body)).into_response()
        }
    }
}
