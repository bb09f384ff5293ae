//! Per-principal dual-window rate limiting
//!
//! Every principal key owns two token buckets: a minute window and an hour
//! window. An admission check consumes from both and succeeds only if both
//! had a token. The bucket that still had capacity is not refunded when the
//! other denies, so a denied request can over-debit one window by a single
//! token.
//!
//! State is created lazily on the first check for a key and dropped by the
//! idle sweep once both buckets have refilled completely.
//!
//! ```rust
//! use expensegate_auth::rate_limit::RateLimiter;
//! use expensegate_auth::config::RateLimitConfig;
//!
//! let limiter = RateLimiter::new(RateLimitConfig::default().with_per_minute(2));
//! assert!(limiter.check_quota("user-1").is_ok());
//! assert!(limiter.check_quota("user-1").is_ok());
//!
//! let denied = limiter.check_quota("user-1").unwrap_err();
//! assert!(denied.retry_after_secs >= 1);
//! ```

mod bucket;
pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use self::bucket::TokenBucket;
use crate::config::RateLimitConfig;
use crate::error::QuotaExceeded;

const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// Remaining quota for one principal, as reported in response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// Minute window capacity
    pub limit_per_minute: u32,
    /// Whole tokens left in the minute window
    pub remaining_per_minute: u32,
    /// Hour window capacity
    pub limit_per_hour: u32,
    /// Whole tokens left in the hour window
    pub remaining_per_hour: u32,
}

impl QuotaSnapshot {
    /// Snapshot of an untouched key
    pub fn full(config: &RateLimitConfig) -> Self {
        Self {
            limit_per_minute: config.per_minute,
            remaining_per_minute: config.per_minute,
            limit_per_hour: config.per_hour,
            remaining_per_hour: config.per_hour,
        }
    }
}

/// The two buckets of one principal, each behind its own lock
#[derive(Debug)]
struct UserQuota {
    minute: Mutex<TokenBucket>,
    hour: Mutex<TokenBucket>,
}

impl UserQuota {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            minute: Mutex::new(TokenBucket::new(config.per_minute, MINUTE_WINDOW, now)),
            hour: Mutex::new(TokenBucket::new(config.per_hour, HOUR_WINDOW, now)),
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.minute.lock().is_full(now) && self.hour.lock().is_full(now)
    }
}

#[derive(Debug)]
struct Inner {
    config: RateLimitConfig,
    quotas: DashMap<String, Arc<UserQuota>>,
    clock: Arc<dyn Clock>,
}

/// Dual-window limiter keyed by principal
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Create a limiter on the system clock
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a limiter on a caller-supplied clock
    ///
    /// Zero capacities are raised to one, and [`RateLimiter::config`] and
    /// every [`QuotaSnapshot`] report the raised value.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: config.effective(),
                quotas: DashMap::new(),
                clock,
            }),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.inner.config
    }

    fn quota_for(&self, key: &str, now: Instant) -> Arc<UserQuota> {
        if let Some(existing) = self.inner.quotas.get(key) {
            return Arc::clone(existing.value());
        }
        // entry() holds the shard lock, so racing first requests share one value
        let entry = self
            .inner
            .quotas
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(UserQuota::new(&self.inner.config, now)));
        Arc::clone(entry.value())
    }

    /// Consume one request from both windows
    ///
    /// # Errors
    ///
    /// Returns [`QuotaExceeded`] when either window is empty. The retry hint
    /// is the longer of the two waits, rounded up, and at least one second.
    pub fn check_quota(&self, key: &str) -> Result<(), QuotaExceeded> {
        let now = self.inner.clock.now();
        let quota = self.quota_for(key, now);

        // both buckets are always charged
        let minute = quota.minute.lock().try_consume(now);
        let hour = quota.hour.lock().try_consume(now);

        let wait = match (minute, hour) {
            (Ok(()), Ok(())) => return Ok(()),
            (Err(m), Ok(())) => m,
            (Ok(()), Err(h)) => h,
            (Err(m), Err(h)) => m.max(h),
        };

        let retry_after_secs = (wait.as_secs_f64().ceil() as u64).max(1);
        warn!(key = %key, retry_after_secs, "Rate limit exceeded for user");
        Err(QuotaExceeded { retry_after_secs })
    }

    /// Remaining quota for `key` without consuming or creating state
    pub fn get_quota_snapshot(&self, key: &str) -> QuotaSnapshot {
        let config = &self.inner.config;
        let Some(quota) = self.inner.quotas.get(key).map(|q| Arc::clone(q.value())) else {
            return QuotaSnapshot::full(config);
        };

        let now = self.inner.clock.now();
        let remaining_per_minute = quota.minute.lock().remaining(now);
        let remaining_per_hour = quota.hour.lock().remaining(now);
        QuotaSnapshot {
            limit_per_minute: config.per_minute,
            remaining_per_minute,
            limit_per_hour: config.per_hour,
            remaining_per_hour,
        }
    }

    /// Drop the state for `key`; its next check starts from full buckets
    pub fn clear(&self, key: &str) {
        if self.inner.quotas.remove(key).is_some() {
            debug!(key = %key, "Cleared rate limit state");
        }
    }

    /// Drop every key
    pub fn clear_all(&self) {
        self.inner.quotas.clear();
    }

    /// Number of keys with live state
    pub fn tracked_keys(&self) -> usize {
        self.inner.quotas.len()
    }

    /// Remove every key whose two buckets both read full
    ///
    /// Returns how many keys were removed.
    pub fn evict_idle(&self) -> usize {
        let now = self.inner.clock.now();
        let mut evicted = 0;
        self.inner.quotas.retain(|_, quota| {
            let idle = quota.is_idle(now);
            if idle {
                evicted += 1;
            }
            !idle
        });

        if evicted > 0 {
            debug!(
                evicted,
                remaining = self.inner.quotas.len(),
                "Evicted idle rate limit entries"
            );
        }
        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) every `eviction_interval`
    ///
    /// Must be called inside a tokio runtime. The sweep stops when the
    /// handle is aborted or the runtime shuts down.
    pub fn spawn_eviction_task(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.inner.config.eviction_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                limiter.evict_idle();
            }
        })
    }
}
