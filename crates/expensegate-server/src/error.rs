//! HTTP error mapping
//!
//! Every non-2xx response carries the same JSON body:
//!
//! ```json
//! {
//!   "message": "Rate limit exceeded: Too many requests",
//!   "timestamp": "2026-01-01T12:00:00.000Z",
//!   "status": 429,
//!   "error": "Too Many Requests",
//!   "path": "/api/me",
//!   "validationErrors": {}
//! }
//! ```

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use expensegate_auth::AdmissionError;
use serde::{Deserialize, Serialize};

/// Canonical user-facing messages
pub mod messages {
    pub const VALIDATION_ERROR: &str = "Validation failed";
    pub const MALFORMED_JSON: &str = "Invalid JSON format: Check your request body";
    pub const UNAUTHORIZED: &str = "Unauthorized Access";
    pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
    pub const EMAIL_ALREADY_EXISTS: &str = "Email already registered";
    pub const USERNAME_ALREADY_EXISTS: &str = "Username already registered";
    pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded: Too many requests";
    pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub path: String,
    pub validation_errors: BTreeMap<String, String>,
}

/// An error on its way to becoming an HTTP response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
    validation_errors: BTreeMap<String, String>,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Error with an arbitrary status and message
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            path: path.into(),
            validation_errors: BTreeMap::new(),
            retry_after_secs: None,
        }
    }

    /// 400 with per-field messages
    pub fn validation(errors: BTreeMap<String, String>, path: impl Into<String>) -> Self {
        Self {
            validation_errors: errors,
            ..Self::new(StatusCode::BAD_REQUEST, messages::VALIDATION_ERROR, path)
        }
    }

    /// 400 for a body that is not the expected JSON
    pub fn malformed_json(path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, messages::MALFORMED_JSON, path)
    }

    /// 401 for a request without a resolved principal
    pub fn unauthorized(path: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, messages::UNAUTHORIZED, path)
    }

    /// 401 for a failed login
    pub fn invalid_credentials(path: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, messages::INVALID_CREDENTIALS, path)
    }

    /// 409 for a uniqueness violation
    pub fn conflict(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, path)
    }

    /// 429 carrying a `Retry-After` hint
    pub fn rate_limited(retry_after_secs: u64, path: impl Into<String>) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                messages::RATE_LIMIT_EXCEEDED,
                path,
            )
        }
    }

    /// 500; the detail is logged, never returned
    pub fn internal(detail: impl std::fmt::Display, path: impl Into<String>) -> Self {
        tracing::error!(error = %detail, "Internal server error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::INTERNAL_SERVER_ERROR,
            path,
        )
    }

    /// Map a pipeline rejection
    pub fn from_admission(err: &AdmissionError, path: impl Into<String>) -> Self {
        match err {
            AdmissionError::QuotaExceeded(q) => Self::rate_limited(q.retry_after_secs, path),
        }
    }

    /// HTTP status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    fn body(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.message.clone(),
            timestamp: Utc::now(),
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            path: self.path.clone(),
            validation_errors: self.validation_errors.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut resp = (self.status, Json(self.body())).into_response();

        if let Some(secs) = self.retry_after_secs {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        resp
    }
}
