//! Application state and router assembly

use std::sync::Arc;

use axum::{Router, middleware};
use expensegate_auth::{
    AdmissionConfig, AdmissionInterceptor, AuthenticationGate, Pipeline, RateLimiter, TokenCodec,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ServerConfig};
use crate::middleware::admission_middleware;
use crate::routes;
use crate::store::AccountStore;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Issues and validates tokens
    pub codec: Arc<TokenCodec>,
    /// Registered accounts
    pub accounts: AccountStore,
    /// Per-principal rate limits
    pub limiter: RateLimiter,
    /// Authentication then rate limiting
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Wire the admission pipeline over the given parts
    pub fn new(
        codec: Arc<TokenCodec>,
        accounts: AccountStore,
        limiter: RateLimiter,
        admission: AdmissionConfig,
    ) -> Self {
        let pipeline = Pipeline::standard(
            AuthenticationGate::new(Arc::clone(&codec), Arc::new(accounts.clone())),
            AdmissionInterceptor::new(limiter.clone(), admission),
        );

        Self {
            codec,
            accounts,
            limiter,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Build state from loaded configuration with an empty account store
    ///
    /// # Errors
    ///
    /// Returns an error when the signing secret is missing or too weak.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let codec = TokenCodec::from_config(&config.auth_config()?)?;
        Ok(Self::new(
            Arc::new(codec),
            AccountStore::new(),
            RateLimiter::new(config.rate_limit_config()),
            config.admission_config(),
        ))
    }
}

/// Router with every endpoint behind the admission pipeline
pub fn build_router(state: AppState) -> Router {
    routes::router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
