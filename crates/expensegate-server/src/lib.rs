//! # expensegate-server
//!
//! HTTP front end for the expense tracker API. Every request passes through
//! the [`expensegate_auth`] admission pipeline: bearer tokens are resolved to
//! principals, then each principal is held to its per-minute and per-hour
//! quota.
//!
//! ## Endpoints
//!
//! | Method | Path                | Auth     |
//! |--------|---------------------|----------|
//! | POST   | `/api/auth/signup`  | public   |
//! | POST   | `/api/auth/login`   | public   |
//! | GET    | `/actuator/health`  | public   |
//! | GET    | `/api/me`           | required |
//!
//! ```rust,no_run
//! use expensegate_server::{AppState, ServerConfig, build_router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default().with_secret("a-signing-secret-of-at-least-32-bytes!");
//! let state = AppState::from_config(&config)?;
//! let _eviction = state.limiter.spawn_eviction_task();
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod store;

pub use app::{AppState, build_router};
pub use config::{ConfigError, LoggingConfig, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use extract::CurrentPrincipal;
pub use logging::LoggingGuard;
pub use store::{Account, AccountError, AccountStore};
