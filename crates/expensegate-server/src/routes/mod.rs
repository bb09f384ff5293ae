//! HTTP endpoints

use axum::Router;
use axum::routing::{get, post};

use crate::app::AppState;

pub mod auth;
pub mod health;
pub mod me;

/// All routes, without middleware or state
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/login", post(auth::login))
        .route("/actuator/health", get(health::health))
        .route("/api/me", get(me::me))
}
