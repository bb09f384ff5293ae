//! Per-request admission context
//!
//! A [`RequestContext`] is created by the entry point for each inbound
//! request, handed mutably to every pipeline stage in order, and finally
//! attached to the request for downstream handlers. It is never shared
//! between requests, so a binding made for one caller cannot leak to another.

use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::principal::Principal;
use crate::rate_limit::QuotaSnapshot;

/// Scheme prefix of the bearer credential
pub const BEARER_PREFIX: &str = "Bearer ";

/// Identity bound to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authentication {
    /// No identity established
    #[default]
    Anonymous,
    /// Identity resolved from a valid token
    Authenticated {
        /// Resolved principal, shared with the store
        principal: Arc<Principal>,
        /// Authorities derived from the principal's role
        authorities: Vec<String>,
    },
}

impl Authentication {
    /// Bind a principal with its derived authority set
    pub fn authenticated(principal: Arc<Principal>) -> Self {
        let authorities = principal.authorities();
        Authentication::Authenticated {
            principal,
            authorities,
        }
    }

    /// The bound principal, if any
    pub fn principal(&self) -> Option<&Arc<Principal>> {
        match self {
            Authentication::Anonymous => None,
            Authentication::Authenticated { principal, .. } => Some(principal),
        }
    }

    /// Authorities of the bound principal (empty when anonymous)
    pub fn authorities(&self) -> &[String] {
        match self {
            Authentication::Anonymous => &[],
            Authentication::Authenticated { authorities, .. } => authorities,
        }
    }

    /// Whether this is the anonymous placeholder
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Authentication::Anonymous)
    }
}

/// State carried through the admission pipeline for one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: String,
    headers: HeaderMap,
    authentication: Authentication,
    quota: Option<QuotaSnapshot>,
}

impl RequestContext {
    /// Create a context for the given request path and headers
    pub fn new(path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            path: path.into(),
            headers,
            authentication: Authentication::Anonymous,
            quota: None,
        }
    }

    /// Build a context from HTTP request parts
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self::new(parts.uri.path(), parts.headers.clone())
    }

    /// Request path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Bearer credential from the `Authorization` header, if present
    ///
    /// Headers that are not valid UTF-8, use another scheme, or carry an empty
    /// credential are treated as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Current identity binding
    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    /// Bound principal, if any
    pub fn principal(&self) -> Option<&Arc<Principal>> {
        self.authentication.principal()
    }

    /// Whether a principal is bound
    pub fn is_authenticated(&self) -> bool {
        !self.authentication.is_anonymous()
    }

    /// Bind a principal; returns `false` and leaves the context untouched if
    /// one is already bound
    pub fn bind(&mut self, principal: Arc<Principal>) -> bool {
        if self.is_authenticated() {
            return false;
        }
        self.authentication = Authentication::authenticated(principal);
        true
    }

    /// Quota recorded by the admission stage
    pub fn quota(&self) -> Option<&QuotaSnapshot> {
        self.quota.as_ref()
    }

    pub(crate) fn set_quota(&mut self, quota: QuotaSnapshot) {
        self.quota = Some(quota);
    }
}
