//! Authentication gate
//!
//! Resolves the bearer credential of a request into a bound [`Principal`].
//! The gate never rejects: a missing, invalid or expired token and any store
//! failure all leave the request anonymous. Rejecting anonymous callers on
//! protected paths is the job of downstream authorization.
//!
//! [`Principal`]: crate::principal::Principal

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::context::RequestContext;
use crate::error::{AdmissionError, AuthError};
use crate::jwt::TokenCodec;
use crate::pipeline::Stage;
use crate::principal::PrincipalStore;

/// Binds a principal to the request when a valid token is present
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    codec: Arc<TokenCodec>,
    store: Arc<dyn PrincipalStore>,
}

impl AuthenticationGate {
    /// Create a gate over the given codec and store
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn PrincipalStore>) -> Self {
        Self { codec, store }
    }

    /// Codec used to validate tokens
    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Authenticate the request in `ctx`
    ///
    /// Safe to call more than once: a context that already has a principal is
    /// left as is.
    pub async fn authenticate(&self, ctx: &mut RequestContext) {
        if let Err(e) = self.try_authenticate(ctx).await {
            match e {
                AuthError::PrincipalNotFound(_)
                | AuthError::TokenExpired
                | AuthError::TokenInvalid(_) => {
                    warn!(path = %ctx.path(), error = %e, "Could not set user authentication");
                }
                _ => {
                    error!(path = %ctx.path(), error = %e, "Could not set user authentication");
                }
            }
        }
    }

    async fn try_authenticate(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        let Some(token) = ctx.bearer_token() else {
            return Ok(());
        };

        if ctx.is_authenticated() {
            return Ok(());
        }

        let email = self.codec.decode(token)?.email;
        if email.is_empty() {
            return Err(AuthError::TokenInvalid("empty email claim".into()));
        }

        let principal = self.store.load_by_email(&email).await?;

        if ctx.bind(principal) {
            debug!(email = %email, "User authenticated via JWT");
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), AdmissionError> {
        self.authenticate(ctx).await;
        Ok(())
    }
}
