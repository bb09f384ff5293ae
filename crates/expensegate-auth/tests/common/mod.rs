//! Shared fixtures for expensegate-auth integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use expensegate_auth::{
    AdmissionConfig, AdmissionInterceptor, AuthenticationGate, ManualClock, MemoryPrincipalStore,
    Pipeline, Principal, RateLimitConfig, RateLimiter, RequestContext, Role, TokenCodec,
};
use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

/// HS256 secret long enough for the codec
pub const TEST_SECRET: &[u8] = b"integration_test_secret_key_32_bytes_min!";

/// Everything needed to drive the pipeline in a test
pub struct Harness {
    pub codec: Arc<TokenCodec>,
    pub store: MemoryPrincipalStore,
    pub limiter: RateLimiter,
    pub clock: Arc<ManualClock>,
    pub pipeline: Pipeline,
}

impl Harness {
    /// Default limits (60/minute, 1000/hour) on a manual clock
    pub fn new() -> Self {
        Self::with_limits(RateLimitConfig::default())
    }

    pub fn with_limits(config: RateLimitConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(TEST_SECRET, Duration::from_secs(3600)).unwrap());
        let store = MemoryPrincipalStore::new();
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(config, clock.clone());

        let pipeline = Pipeline::standard(
            AuthenticationGate::new(Arc::clone(&codec), Arc::new(store.clone())),
            AdmissionInterceptor::new(limiter.clone(), AdmissionConfig::default()),
        );

        Self {
            codec,
            store,
            limiter,
            clock,
            pipeline,
        }
    }

    /// Register a principal and issue a token for it
    pub fn sign_in(&self, username: &str) -> (Arc<Principal>, String) {
        let principal = self.store.insert(Principal::new(
            username,
            format!("{username}@example.com"),
            Role::User,
        ));
        let token = self.codec.generate_token(&principal).unwrap();
        (principal, token)
    }
}

/// Context for `path` carrying `Authorization: Bearer <token>`
pub fn bearer_context(path: &str, token: &str) -> RequestContext {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    RequestContext::new(path, headers)
}

/// Context for `path` without credentials
pub fn anonymous_context(path: &str) -> RequestContext {
    RequestContext::new(path, HeaderMap::new())
}
