//! Extractors for handlers behind the admission middleware

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use expensegate_auth::{Authentication, Principal};
use tracing::debug;

use crate::error::ApiError;

/// The authenticated caller; rejects anonymous requests with 401
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Arc<Principal>);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<Authentication>()
            .and_then(Authentication::principal)
        {
            Some(principal) => Ok(Self(Arc::clone(principal))),
            None => {
                debug!(path = %parts.uri.path(), "Rejecting unauthenticated request");
                Err(ApiError::unauthorized(parts.uri.path()))
            }
        }
    }
}
