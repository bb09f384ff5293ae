//! Rate-limit admission for authenticated requests
//!
//! Runs after the [`AuthenticationGate`](crate::gate::AuthenticationGate).
//! Public paths and anonymous requests pass untouched. For a bound
//! principal the interceptor charges the [`RateLimiter`] and records the
//! remaining quota so the entry point can emit the `X-RateLimit-*` headers.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use crate::config::AdmissionConfig;
use crate::context::RequestContext;
use crate::error::AdmissionError;
use crate::pipeline::Stage;
use crate::rate_limit::{QuotaSnapshot, RateLimiter};

/// Minute window capacity header
pub const HEADER_LIMIT_MINUTE: &str = "x-ratelimit-limit-minute";
/// Minute window remaining header
pub const HEADER_REMAINING_MINUTE: &str = "x-ratelimit-remaining-minute";
/// Hour window capacity header
pub const HEADER_LIMIT_HOUR: &str = "x-ratelimit-limit-hour";
/// Hour window remaining header
pub const HEADER_REMAINING_HOUR: &str = "x-ratelimit-remaining-hour";

/// Per-principal rate limiting stage
#[derive(Debug, Clone)]
pub struct AdmissionInterceptor {
    limiter: RateLimiter,
    config: AdmissionConfig,
}

impl AdmissionInterceptor {
    /// Create an interceptor over a shared limiter
    pub fn new(limiter: RateLimiter, config: AdmissionConfig) -> Self {
        Self { limiter, config }
    }

    /// The limiter this interceptor charges
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Admit or reject the request in `ctx`
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::QuotaExceeded`] when the bound principal has
    /// exhausted either window.
    pub fn admit(&self, ctx: &mut RequestContext) -> Result<(), AdmissionError> {
        if self.config.is_public(ctx.path()) {
            trace!(path = %ctx.path(), "Public path, skipping rate limit");
            return Ok(());
        }

        let Some(key) = ctx.principal().map(|p| p.rate_limit_key()) else {
            return Ok(());
        };

        self.limiter.check_quota(&key)?;
        ctx.set_quota(self.limiter.get_quota_snapshot(&key));
        Ok(())
    }
}

#[async_trait]
impl Stage for AdmissionInterceptor {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), AdmissionError> {
        self.admit(ctx)
    }
}

/// Write the four quota headers into `headers`
pub fn apply_quota_headers(headers: &mut HeaderMap, quota: &QuotaSnapshot) {
    let pairs = [
        (HEADER_LIMIT_MINUTE, quota.limit_per_minute),
        (HEADER_REMAINING_MINUTE, quota.remaining_per_minute),
        (HEADER_LIMIT_HOUR, quota.limit_per_hour),
        (HEADER_REMAINING_HOUR, quota.remaining_per_hour),
    ];
    for (name, value) in pairs {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
}
