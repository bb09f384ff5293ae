//! Compact identity tokens
//!
//! Tokens are standard JWS compact serialisations (`header.payload.signature`,
//! base64url segments) signed with HMAC-SHA256 under a shared secret.
//!
//! # Claims
//!
//! | claim | meaning |
//! |---|---|
//! | `sub` | principal id (UUID) |
//! | `email` | login identifier, used to resolve the principal |
//! | `username` | display name |
//! | `role` | `USER` or `ADMIN` |
//! | `iat` | issued at, Unix seconds |
//! | `exp` | absolute expiry, Unix seconds |

pub mod codec;

pub use codec::{MAX_TOKEN_LENGTH, MIN_SECRET_LENGTH, TokenCodec};

use serde::{Deserialize, Serialize};

use crate::principal::Role;

/// Claims carried by every token this crate issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal id)
    pub sub: String,
    /// Email of the principal
    pub email: String,
    /// Username of the principal
    pub username: String,
    /// Role of the principal
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl TokenClaims {
    /// Lifetime encoded in the token, in seconds
    pub fn lifetime_secs(&self) -> u64 {
        self.exp.saturating_sub(self.iat)
    }
}
