//! Configuration for the admission pipeline
//!
//! All three structs have production defaults and `with_*` builders so
//! the server can layer file and environment settings on top.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default minute-window capacity
pub const DEFAULT_LIMIT_PER_MINUTE: u32 = 60;

/// Default hour-window capacity
pub const DEFAULT_LIMIT_PER_HOUR: u32 = 1000;

/// Default idle-eviction sweep interval (10 minutes)
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(600);

/// Path prefixes exempt from rate limiting by default
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] =
    &["/api/auth/", "/actuator/", "/swagger-ui/", "/v3/api-docs/"];

/// How the configured signing secret is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretEncoding {
    /// The secret string's UTF-8 bytes are the key
    #[default]
    Raw,
    /// The secret is standard base64 and decodes to the key
    Base64,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret
    pub secret: SecretString,
    /// Encoding of `secret`
    pub secret_encoding: SecretEncoding,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Clock skew tolerated when checking `exp`, in seconds
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Create a config with the given raw secret and default TTL
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            secret_encoding: SecretEncoding::Raw,
            token_ttl: DEFAULT_TOKEN_TTL,
            leeway_secs: 0,
        }
    }

    /// Set the secret encoding
    #[must_use]
    pub fn with_secret_encoding(mut self, encoding: SecretEncoding) -> Self {
        self.secret_encoding = encoding;
        self
    }

    /// Set the token lifetime
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the expiry leeway
    #[must_use]
    pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}

/// Dual-window rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minute bucket capacity (refilled over 60 seconds)
    pub per_minute: u32,
    /// Hour bucket capacity (refilled over 3600 seconds)
    pub per_hour: u32,
    /// Interval between idle-eviction sweeps
    pub eviction_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: DEFAULT_LIMIT_PER_MINUTE,
            per_hour: DEFAULT_LIMIT_PER_HOUR,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
        }
    }
}

impl RateLimitConfig {
    /// Set the minute capacity
    #[must_use]
    pub fn with_per_minute(mut self, per_minute: u32) -> Self {
        self.per_minute = per_minute;
        self
    }

    /// Set the hour capacity
    #[must_use]
    pub fn with_per_hour(mut self, per_hour: u32) -> Self {
        self.per_hour = per_hour;
        self
    }

    /// Set the eviction sweep interval
    #[must_use]
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Capacities as enforced: a window always admits at least one request
    #[must_use]
    pub fn effective(mut self) -> Self {
        self.per_minute = self.per_minute.max(1);
        self.per_hour = self.per_hour.max(1);
        self
    }
}

/// Admission interceptor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Path prefixes that skip rate limiting
    pub public_prefixes: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            public_prefixes: DEFAULT_PUBLIC_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl AdmissionConfig {
    /// Replace the public prefixes
    #[must_use]
    pub fn with_public_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.public_prefixes = prefixes;
        self
    }

    /// Add one public prefix
    #[must_use]
    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    /// Check if a path is exempt from rate limiting
    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|p| path.starts_with(p))
    }
}
