//! Shared fixtures for expensegate-server integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use expensegate_auth::{AdmissionConfig, ManualClock, RateLimitConfig, RateLimiter, TokenCodec};
use expensegate_server::{AccountStore, AppState, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// HS256 secret long enough for the codec
pub const TEST_SECRET: &[u8] = b"server_integration_secret_key_32_bytes!";

pub const PASSWORD: &str = "Secret12!";

/// A router over fresh state, with a clock the test controls
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(RateLimitConfig::default())
    }

    pub fn with_limits(config: RateLimitConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(TEST_SECRET, Duration::from_secs(3600)).unwrap());
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(config, clock.clone());
        let state = AppState::new(
            codec,
            AccountStore::new(),
            limiter,
            AdmissionConfig::default(),
        );

        Self {
            router: build_router(state.clone()),
            state,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response<Body> {
        self.send(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Sign up then log in; returns the access token
    pub async fn register_and_login(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let resp = self
            .post_json(
                "/api/auth/signup",
                &json!({ "username": username, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = self
            .post_json(
                "/api/auth/login",
                &json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        body_json(resp).await["accessToken"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header_u64(resp: &Response<Body>, name: &str) -> Option<u64> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
