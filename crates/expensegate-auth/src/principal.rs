//! Resolved caller identity and the store that produces it
//!
//! A [`Principal`] is a plain, immutable snapshot. The store owns it and hands
//! out `Arc`s, so the request context references the same allocation instead
//! of copying it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Authority prefix applied to roles
pub const ROLE_PREFIX: &str = "ROLE_";

/// Coarse role carried in tokens and authority sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular account
    #[default]
    User,
    /// Administrative account
    Admin,
}

impl Role {
    /// Wire name, as stored in the `role` claim
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Authority string derived from this role (`ROLE_USER`, ...)
    pub fn authority(&self) -> String {
        format!("{ROLE_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(AuthError::TokenInvalid(format!("unknown role '{other}'"))),
        }
    }
}

/// Resolved identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identity key
    pub id: Uuid,
    /// Display name
    pub username: String,
    /// Login identifier, also the `email` claim used for resolution
    pub email: String,
    /// Role granted to the principal
    pub role: Role,
}

impl Principal {
    /// Create a principal with a fresh id
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            role,
        }
    }

    /// Key under which the rate limiter tracks this principal
    pub fn rate_limit_key(&self) -> String {
        self.id.to_string()
    }

    /// Authority set derived from the role
    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.authority()]
    }
}

/// Resolves a stable identity key to a [`Principal`]
///
/// This is the seam between the admission pipeline and whatever persists
/// accounts. Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait PrincipalStore: Send + Sync + fmt::Debug {
    /// Look up a principal by email
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PrincipalNotFound`] when no principal matches, or
    /// [`AuthError::Store`] when the backing store fails.
    async fn load_by_email(&self, email: &str) -> AuthResult<Arc<Principal>>;
}

/// Concurrent in-memory [`PrincipalStore`]
///
/// ```rust
/// use expensegate_auth::{MemoryPrincipalStore, Principal, PrincipalStore, Role};
///
/// # tokio_test::block_on(async {
/// let store = MemoryPrincipalStore::new();
/// store.insert(Principal::new("dana", "dana@example.com", Role::User));
///
/// let dana = store.load_by_email("dana@example.com").await.unwrap();
/// assert_eq!(dana.username, "dana");
/// # });
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryPrincipalStore {
    by_email: Arc<DashMap<String, Arc<Principal>>>,
}

impl MemoryPrincipalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a principal, replacing any previous entry with the same email
    pub fn insert(&self, principal: Principal) -> Arc<Principal> {
        let principal = Arc::new(principal);
        self.by_email
            .insert(principal.email.clone(), Arc::clone(&principal));
        principal
    }

    /// Insert only if the email is not yet taken
    ///
    /// Returns `None` when another principal already owns the email.
    pub fn insert_new(&self, principal: Principal) -> Option<Arc<Principal>> {
        use dashmap::mapref::entry::Entry;

        match self.by_email.entry(principal.email.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let principal = Arc::new(principal);
                slot.insert(Arc::clone(&principal));
                Some(principal)
            }
        }
    }

    /// Remove a principal by email
    pub fn remove(&self, email: &str) -> Option<Arc<Principal>> {
        self.by_email.remove(email).map(|(_, p)| p)
    }

    /// Whether any principal uses this username
    pub fn username_taken(&self, username: &str) -> bool {
        self.by_email.iter().any(|p| p.username == username)
    }

    /// Number of stored principals
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn load_by_email(&self, email: &str) -> AuthResult<Arc<Principal>> {
        self.by_email
            .get(email)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AuthError::PrincipalNotFound(email.to_string()))
    }
}
