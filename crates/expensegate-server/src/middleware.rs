//! Admission middleware
//!
//! Runs the [`Pipeline`](expensegate_auth::Pipeline) once per request,
//! stores the resulting [`Authentication`] in the request extensions and
//! adds the quota headers to the response.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use expensegate_auth::{Authentication, RequestContext, apply_quota_headers};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticate, rate limit, then hand over to the router
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut ctx = RequestContext::from_parts(&parts);

    if let Err(e) = state.pipeline.run(&mut ctx).await {
        return ApiError::from_admission(&e, ctx.path()).into_response();
    }

    let quota = ctx.quota().copied();
    parts
        .extensions
        .insert::<Authentication>(ctx.authentication().clone());

    let mut response = next.run(Request::from_parts(parts, body)).await;

    if let Some(quota) = quota {
        apply_quota_headers(response.headers_mut(), &quota);
    }
    response
}
