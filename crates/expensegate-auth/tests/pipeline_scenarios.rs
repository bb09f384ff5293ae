//! End-to-end admission scenarios through the standard pipeline

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Harness, anonymous_context, bearer_context};
use expensegate_auth::{AdmissionError, Principal, RateLimitConfig, Role, TokenCodec};

#[tokio::test]
async fn test_authenticated_request_gets_quota() {
    let harness = Harness::new();
    let (alice, token) = harness.sign_in("alice");

    let mut ctx = bearer_context("/api/expenses", &token);
    harness.pipeline.run(&mut ctx).await.unwrap();

    assert!(Arc::ptr_eq(ctx.principal().unwrap(), &alice));
    assert_eq!(ctx.authentication().authorities(), ["ROLE_USER".to_string()]);

    let quota = ctx.quota().unwrap();
    assert_eq!(quota.remaining_per_minute, 59);
    assert_eq!(quota.remaining_per_hour, 999);
}

#[tokio::test]
async fn test_anonymous_request_passes_unlimited() {
    let harness = Harness::with_limits(RateLimitConfig::default().with_per_minute(1));

    for _ in 0..10 {
        let mut ctx = anonymous_context("/api/expenses");
        harness.pipeline.run(&mut ctx).await.unwrap();
        assert!(!ctx.is_authenticated());
        assert!(ctx.quota().is_none());
    }
    assert_eq!(harness.limiter.tracked_keys(), 0);
}

#[tokio::test]
async fn test_invalid_token_is_anonymous_not_rejected() {
    let harness = Harness::new();
    let mut ctx = bearer_context("/api/expenses", "eyJhbGciOiJIUzI1NiJ9.e30.bogus");

    harness.pipeline.run(&mut ctx).await.unwrap();
    assert!(!ctx.is_authenticated());
}

#[tokio::test]
async fn test_expired_token_is_anonymous() {
    let harness = Harness::new();
    let (_, token) = harness.sign_in("bob");
    let short_lived = TokenCodec::new(common::TEST_SECRET, Duration::ZERO).unwrap();
    let principal = harness
        .store
        .insert(Principal::new("carol", "carol@example.com", Role::User));
    let expired = short_lived.generate_token(&principal).unwrap();

    // give the zero-lifetime token time to lapse
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let mut ctx = bearer_context("/api/expenses", &expired);
    harness.pipeline.run(&mut ctx).await.unwrap();
    assert!(!ctx.is_authenticated());

    let mut ctx = bearer_context("/api/expenses", &token);
    harness.pipeline.run(&mut ctx).await.unwrap();
    assert!(ctx.is_authenticated());
}

#[tokio::test]
async fn test_sixty_first_request_is_rejected() {
    let harness = Harness::new();
    let (_, token) = harness.sign_in("dave");

    for _ in 0..60 {
        let mut ctx = bearer_context("/api/expenses", &token);
        harness.pipeline.run(&mut ctx).await.unwrap();
    }

    let mut ctx = bearer_context("/api/expenses", &token);
    let err = harness.pipeline.run(&mut ctx).await.unwrap_err();
    let AdmissionError::QuotaExceeded(exceeded) = err;
    assert!(exceeded.retry_after_secs >= 1 && exceeded.retry_after_secs <= 60);

    // still authenticated; only admission failed
    assert!(ctx.is_authenticated());

    let (_, other) = harness.sign_in("erin");
    let mut ctx = bearer_context("/api/expenses", &other);
    assert!(harness.pipeline.run(&mut ctx).await.is_ok());
}

#[tokio::test]
async fn test_public_paths_skip_rate_limit() {
    let harness = Harness::with_limits(RateLimitConfig::default().with_per_minute(1));
    let (_, token) = harness.sign_in("frank");

    for path in [
        "/api/auth/login",
        "/actuator/health",
        "/swagger-ui/index.html",
        "/v3/api-docs/",
    ] {
        for _ in 0..3 {
            let mut ctx = bearer_context(path, &token);
            harness.pipeline.run(&mut ctx).await.unwrap();
            assert!(ctx.is_authenticated());
            assert!(ctx.quota().is_none());
        }
    }
    assert_eq!(harness.limiter.tracked_keys(), 0);
}

#[tokio::test]
async fn test_quota_recovers_after_refill() {
    let harness = Harness::with_limits(RateLimitConfig::default().with_per_minute(2));
    let (_, token) = harness.sign_in("gina");

    for _ in 0..2 {
        let mut ctx = bearer_context("/api/expenses", &token);
        harness.pipeline.run(&mut ctx).await.unwrap();
    }
    let mut ctx = bearer_context("/api/expenses", &token);
    assert!(harness.pipeline.run(&mut ctx).await.is_err());

    // two per minute refills one token every 30s
    harness.clock.advance(Duration::from_secs(30));
    let mut ctx = bearer_context("/api/expenses", &token);
    harness.pipeline.run(&mut ctx).await.unwrap();
    assert_eq!(ctx.quota().unwrap().remaining_per_minute, 0);
}

#[tokio::test]
async fn test_running_pipeline_twice_binds_once() {
    let harness = Harness::new();
    let (alice, token) = harness.sign_in("alice");

    let mut ctx = bearer_context("/api/expenses", &token);
    harness.pipeline.run(&mut ctx).await.unwrap();
    harness.pipeline.run(&mut ctx).await.unwrap();

    assert!(Arc::ptr_eq(ctx.principal().unwrap(), &alice));
    // the second run is a new admission and is charged again
    assert_eq!(ctx.quota().unwrap().remaining_per_minute, 58);
}
