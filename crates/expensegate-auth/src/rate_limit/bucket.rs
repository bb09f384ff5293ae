//! Greedy-refill token bucket
//!
//! Tokens flow back continuously at `capacity / window` per second rather
//! than in one lump at the end of the window, so a caller that spent the
//! whole minute bucket gets its first token back after one second.

use std::time::{Duration, Instant};

/// A single refilling bucket
#[derive(Debug, Clone)]
pub(crate) struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Full bucket holding `capacity` tokens, refilled over `window`
    ///
    /// A zero capacity is raised to one.
    pub(crate) fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        let capacity = f64::from(capacity.max(1));
        let window_secs = window.as_secs_f64().max(f64::EPSILON);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: capacity / window_secs,
            last_refill: now,
        }
    }

    fn available_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * self.refill_per_sec).min(self.capacity)
    }

    fn refill(&mut self, now: Instant) {
        self.tokens = self.available_at(now);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Take one token, or report how long until one is available
    pub(crate) fn try_consume(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }

    /// Whole tokens available at `now`, without touching state
    pub(crate) fn remaining(&self, now: Instant) -> u32 {
        // capacity came from a u32, so the floor fits
        self.available_at(now).floor() as u32
    }

    /// Whether the bucket reads full at `now`
    pub(crate) fn is_full(&self, now: Instant) -> bool {
        self.available_at(now) >= self.capacity
    }
}
