//! Error types for the admission pipeline
//!
//! Token and store failures ([`AuthError`]) never escape the authentication
//! gate: they are logged and the request continues anonymously. Only
//! [`AdmissionError`] reaches the HTTP layer.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type AuthResult<T> = Result<T, AuthError>;

/// Failures raised while issuing or resolving an identity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Signature, structure, algorithm or claim problems
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// The token's `exp` claim has elapsed
    #[error("Token expired")]
    TokenExpired,

    /// The token could not be produced
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Signing secret is too short for HMAC-SHA256
    #[error("Signing secret is {actual} bytes, at least {minimum} required")]
    WeakSecret {
        /// Length of the supplied secret
        actual: usize,
        /// Minimum accepted length
        minimum: usize,
    },

    /// The store has no principal for the given key
    #[error("Principal not found: {0}")]
    PrincipalNotFound(String),

    /// The store failed for another reason
    #[error("Principal store error: {0}")]
    Store(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(err.to_string()),
        }
    }
}

/// Raised by the rate limiter when either window is exhausted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Too many requests. Try again in {retry_after_secs} seconds")]
pub struct QuotaExceeded {
    /// Whole seconds until both windows can admit another request
    pub retry_after_secs: u64,
}

impl QuotaExceeded {
    /// Retry hint as a [`Duration`]
    pub fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }
}

/// Rejections produced by pipeline stages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Per-principal quota exhausted
    #[error(transparent)]
    QuotaExceeded(#[from] QuotaExceeded),
}

impl AdmissionError {
    /// HTTP status code for this rejection
    pub fn http_status(&self) -> u16 {
        match self {
            AdmissionError::QuotaExceeded(_) => 429,
        }
    }

    /// Seconds to advertise in `Retry-After`, when applicable
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AdmissionError::QuotaExceeded(q) => Some(q.retry_after_secs),
        }
    }
}
