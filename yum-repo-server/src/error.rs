//! # Error Handling and Response Types
//!
//! Every failure a request can run into is an [`AppError`]. The variants follow
//! the repository's failure classes:
//!
//! - **Validation** (400 / 415): bad form field, unsafe filename, wrong extension.
//!   Nothing on disk has been touched.
//! - **Payload too large** (413): the upload exceeded the body limit. A
//!   partially written file may remain.
//! - **I/O** also covers an upload body that broke off after the package file
//!   was created.
//! - **Conflict** (403): protected mode refuses to overwrite an existing package.
//! - **Not Found** (404): the package to delete does not exist.
//! - **Unauthorized** (401): the access guard rejected the credentials.
//! - **I/O** (500): the repository store failed to write or remove a file.
//! - **Tool failure** (500): the metadata tool could not be started or exited
//!   non-zero. The filesystem change that preceded it is *not* rolled back.
//!
//! All API errors are returned in a consistent JSON format:
//!
//! ```json
//! {
//!   "error": "Human-readable error message",
//!   "code": "machine_readable_error_code",
//!   "details": {...},
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,          // Human-readable error message
    pub code: String,           // Machine-readable error code
    pub details: Option<Value>, // Additional error details
    pub timestamp: String,      // ISO 8601 timestamp
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    PayloadTooLarge,
    UnsupportedMediaType,
    Conflict,
    NotFound,
    AuthError,
    IoError,
    ToolFailure,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::PayloadTooLarge => "payload_too_large",
            ErrorCode::UnsupportedMediaType => "unsupported_media_type",
            ErrorCode::Conflict => "conflict",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AuthError => "auth_error",
            ErrorCode::IoError => "io_error",
            ErrorCode::ToolFailure => "tool_failure",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            // Protected mode answers an overwrite attempt with 403.
            ErrorCode::Conflict => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AuthError => StatusCode::UNAUTHORIZED,
            ErrorCode::IoError | ErrorCode::ToolFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Application-specific error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart form parsing error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    ToolFailure {
        message: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ErrorCode::PayloadTooLarge
            }
            AppError::BadRequest(_) | AppError::Multipart(_) => ErrorCode::ValidationError,
            AppError::UnsupportedMediaType(_) => ErrorCode::UnsupportedMediaType,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Unauthorized(_) => ErrorCode::AuthError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::ToolFailure { .. } => ErrorCode::ToolFailure,
            AppError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    /// Get additional error details if available
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::ToolFailure {
                exit_code, output, ..
            } => Some(json!({
                "exit_code": exit_code,
                "output": output,
            })),
            _ => None,
        }
    }

    /// Prefix the message of a tool failure with what the request had already done.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            AppError::ToolFailure {
                message,
                exit_code,
                output,
            } => AppError::ToolFailure {
                message: format!("{context}: {message}"),
                exit_code,
                output,
            },
            other => other,
        }
    }

    /// Classify a failure reading the upload body after the package file was
    /// created. Anything but an exceeded body limit becomes an I/O failure.
    pub fn into_write_failure(self) -> Self {
        match self {
            AppError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                AppError::Multipart(e)
            }
            AppError::Io(e) => AppError::Io(e),
            other => AppError::Io(std::io::Error::other(other.to_string())),
        }
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        let code = self.error_code();
        ApiErrorResponse {
            error: self.to_string(),
            code: code.as_str().to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        if status.is_server_error() {
            tracing::error!(error = %self, code = code.as_str(), "Request failed");
            if let AppError::ToolFailure {
                exit_code, output, ..
            } = &self
            {
                tracing::error!(exit_code = ?exit_code, output = %output, "Metadata tool output");
            }
        } else {
            tracing::warn!(error = %self, code = code.as_str(), "Request rejected");
        }

        let error_response = self.to_error_response();
        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        let mut response = (status, axum::Json(error_response)).into_response();
        if code == ErrorCode::AuthError {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"yummy\""),
            );
        }
        response
    }
}

/// Convenient result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_follows_failure_classes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::UnsupportedMediaType("x".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (AppError::Conflict("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (
                AppError::Io(std::io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::ToolFailure {
                    message: "x".into(),
                    exit_code: Some(1),
                    output: String::new(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.error_code().http_status(), expected, "{error}");
        }
    }

    #[test]
    fn test_tool_failure_details_carry_output() {
        let error = AppError::ToolFailure {
            message: "createrepo exited with status 2".into(),
            exit_code: Some(2),
            output: "Critical: repodata locked".into(),
        };
        let body = error.to_error_response();
        assert_eq!(body.code, "tool_failure");
        let details = body.details.expect("tool failures carry details");
        assert_eq!(details["exit_code"], 2);
        assert_eq!(details["output"], "Critical: repodata locked");
    }

    #[test]
    fn test_with_context_only_touches_tool_failures() {
        let error = AppError::ToolFailure {
            message: "createrepo exited with status 1".into(),
            exit_code: Some(1),
            output: String::new(),
        }
        .with_context("foo-1.0.rpm stored");
        assert_eq!(
            error.to_string(),
            "foo-1.0.rpm stored: createrepo exited with status 1"
        );

        let untouched = AppError::NotFound("gone".into()).with_context("ignored");
        assert_eq!(untouched.to_string(), "gone");
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let error = AppError::BadRequest("incomplete multipart stream".into()).into_write_failure();
        assert!(matches!(error, AppError::Io(_)));
        assert_eq!(error.error_code().http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.to_string().contains("incomplete multipart stream"));

        let io = AppError::Io(std::io::Error::other("disk full")).into_write_failure();
        assert_eq!(io.to_string(), "I/O error: disk full");
    }

    #[test]
    fn test_unauthorized_response_asks_for_basic_auth() {
        let response = AppError::Unauthorized("missing credentials".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"yummy\""
        );
    }
}
