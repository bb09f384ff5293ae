//! # Expensegate Auth - Request Admission for the Expense API
//!
//! Stateless JWT identity resolution combined with per-principal,
//! dual-window rate limiting. Business handlers only run after a request has
//! passed this pipeline.
//!
//! ## Architecture
//!
//! - [`jwt`] - HS256 token issue and validation ([`TokenCodec`])
//! - [`principal`] - [`Principal`], [`Role`] and the [`PrincipalStore`] seam
//! - [`gate`] - [`AuthenticationGate`], binds a principal or leaves the request anonymous
//! - [`rate_limit`] - [`RateLimiter`], minute and hour token buckets per principal
//! - [`admission`] - [`AdmissionInterceptor`], charges the limiter for authenticated requests
//! - [`pipeline`] - ordered [`Stage`]s run against a [`RequestContext`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use expensegate_auth::{
//!     AdmissionConfig, AdmissionInterceptor, AuthenticationGate, MemoryPrincipalStore,
//!     Pipeline, Principal, RateLimitConfig, RateLimiter, RequestContext, Role, TokenCodec,
//! };
//! use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = Arc::new(TokenCodec::new(
//!     b"an-example-secret-of-at-least-32-bytes!",
//!     Duration::from_secs(3600),
//! )?);
//! let store = MemoryPrincipalStore::new();
//! let alice = store.insert(Principal::new("alice", "alice@example.com", Role::User));
//!
//! let pipeline = Pipeline::standard(
//!     AuthenticationGate::new(Arc::clone(&codec), Arc::new(store)),
//!     AdmissionInterceptor::new(
//!         RateLimiter::new(RateLimitConfig::default()),
//!         AdmissionConfig::default(),
//!     ),
//! );
//!
//! let token = codec.generate_token(&alice)?;
//! let mut headers = HeaderMap::new();
//! headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
//!
//! let mut ctx = RequestContext::new("/api/expenses", headers);
//! pipeline.run(&mut ctx).await?;
//!
//! assert_eq!(ctx.principal().map(|p| p.id), Some(alice.id));
//! assert_eq!(ctx.quota().map(|q| q.remaining_per_minute), Some(59));
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure policy
//!
//! The gate fails open: a missing, malformed, expired or unresolvable
//! credential leaves the request anonymous and never rejects it. The only
//! rejection this crate produces is [`AdmissionError::QuotaExceeded`].

pub mod admission;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod pipeline;
pub mod principal;
pub mod rate_limit;

pub use admission::{AdmissionInterceptor, apply_quota_headers};
pub use config::{AdmissionConfig, AuthConfig, RateLimitConfig, SecretEncoding};
pub use context::{Authentication, RequestContext};
pub use error::{AdmissionError, AuthError, AuthResult, QuotaExceeded};
pub use gate::AuthenticationGate;
pub use jwt::{TokenClaims, TokenCodec};
pub use pipeline::{Pipeline, Stage};
pub use principal::{MemoryPrincipalStore, Principal, PrincipalStore, Role};
pub use rate_limit::{Clock, ManualClock, QuotaSnapshot, RateLimiter, SystemClock};
