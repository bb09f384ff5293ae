//! HS256 token signing and validation
//!
//! [`TokenCodec`] is pure: it holds only the key material and validation
//! rules, so one instance is shared by every request.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    get_current_timestamp,
};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::TokenClaims;
use crate::config::{AuthConfig, SecretEncoding};
use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;

/// Minimum signing secret length (32 bytes = 256 bits for HMAC-SHA256)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Tokens longer than this are rejected before any parsing
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Signs and validates identity tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

// Key material stays out of Debug output
impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec from raw secret bytes
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LENGTH`].
    pub fn new(secret: &[u8], ttl: Duration) -> AuthResult<Self> {
        Self::build(secret, ttl, 0)
    }

    /// Create a codec from a standard-base64 encoded secret
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the secret is not valid base64, or
    /// [`AuthError::WeakSecret`] if it decodes to fewer than
    /// [`MIN_SECRET_LENGTH`] bytes.
    pub fn from_base64_secret(secret: &str, ttl: Duration) -> AuthResult<Self> {
        let bytes = STANDARD
            .decode(secret.trim())
            .map_err(|e| AuthError::Signing(format!("secret is not valid base64: {e}")))?;
        Self::build(&bytes, ttl, 0)
    }

    /// Create a codec from [`AuthConfig`]
    ///
    /// # Errors
    ///
    /// Same as [`TokenCodec::new`] and [`TokenCodec::from_base64_secret`].
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let secret = config.secret.expose_secret();
        let codec = match config.secret_encoding {
            SecretEncoding::Raw => Self::new(secret.as_bytes(), config.token_ttl)?,
            SecretEncoding::Base64 => Self::from_base64_secret(secret, config.token_ttl)?,
        };
        Ok(codec.with_leeway(config.leeway_secs))
    }

    fn build(secret: &[u8], ttl: Duration, leeway_secs: u64) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::WeakSecret {
                actual: secret.len(),
                minimum: MIN_SECRET_LENGTH,
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Set the clock skew tolerated on `exp`
    #[must_use]
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.validation.leeway = leeway_secs;
        self
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Token lifetime in whole seconds, as reported to clients
    pub fn expires_in_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Issue a token for `principal`, valid from now for the configured TTL
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn generate_token(&self, principal: &Principal) -> AuthResult<String> {
        self.generate_token_at(principal, get_current_timestamp())
    }

    pub(crate) fn generate_token_at(
        &self,
        principal: &Principal,
        issued_at: u64,
    ) -> AuthResult<String> {
        let claims = TokenClaims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            username: principal.username.clone(),
            role: principal.role,
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        debug!(user_id = %principal.id, exp = claims.exp, "Issued token");
        Ok(token)
    }

    /// Decode and verify a token
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] for an elapsed `exp`, and
    /// [`AuthError::TokenInvalid`] for every other failure.
    pub fn decode(&self, token: &str) -> AuthResult<TokenClaims> {
        if token.is_empty() {
            return Err(AuthError::TokenInvalid("empty token".into()));
        }
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(AuthError::TokenInvalid(format!(
                "token length {} exceeds {MAX_TOKEN_LENGTH}",
                token.len()
            )));
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Check a token, collapsing every failure into `false`
    pub fn validate(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Invalid JWT token");
                false
            }
        }
    }

    /// Principal id from a validated token
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenInvalid`] if the token does not verify or
    /// `sub` is not a UUID.
    pub fn extract_subject_id(&self, token: &str) -> AuthResult<Uuid> {
        let claims = self.decode(token)?;
        Uuid::parse_str(&claims.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("subject is not a UUID: {e}")))
    }

    /// Named claim from a validated token, rendered as a string
    ///
    /// Returns `Ok(None)` when the claim is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not verify.
    pub fn extract_claim(&self, token: &str, name: &str) -> AuthResult<Option<String>> {
        let claims = self.decode(token)?;
        let value = serde_json::to_value(&claims)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

        Ok(value.get(name).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Role;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes_long_12345678";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::from_secs(3600)).unwrap()
    }

    fn principal() -> Principal {
        Principal::new("alice", "alice@example.com", Role::User)
    }

    #[test]
    fn test_round_trip_claims() {
        let codec = codec();
        let p = principal();
        let token = codec.generate_token(&p).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert!(codec.validate(&token));

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, p.id.to_string());
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.lifetime_secs(), 3600);
    }

    #[test]
    fn test_extractors() {
        let codec = codec();
        let p = principal();
        let token = codec.generate_token(&p).unwrap();

        assert_eq!(codec.extract_subject_id(&token).unwrap(), p.id);
        assert_eq!(
            codec.extract_claim(&token, "email").unwrap().as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(
            codec.extract_claim(&token, "role").unwrap().as_deref(),
            Some("USER")
        );
        assert!(codec.extract_claim(&token, "iat").unwrap().is_some());
        assert_eq!(codec.extract_claim(&token, "tenant").unwrap(), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let issued = get_current_timestamp() - 7200;
        let token = codec.generate_token_at(&principal(), issued).unwrap();

        assert!(!codec.validate(&token));
        assert_eq!(codec.decode(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_leeway_accepts_recently_expired() {
        let codec = codec().with_leeway(120);
        // expired 60 seconds ago
        let issued = get_current_timestamp() - 3660;
        let token = codec.generate_token_at(&principal(), issued).unwrap();
        assert!(codec.validate(&token));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec().generate_token(&principal()).unwrap();
        let other = TokenCodec::new(
            b"another_secret_key_that_is_32_bytes_or_more!",
            Duration::from_secs(3600),
        )
        .unwrap();

        assert!(!other.validate(&token));
        assert!(matches!(other.decode(&token), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = codec.generate_token(&principal()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": Uuid::new_v4().to_string(),
                "email": "mallory@example.com",
                "username": "mallory",
                "role": "ADMIN",
                "iat": get_current_timestamp(),
                "exp": get_current_timestamp() + 3600,
            })
            .to_string(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(!codec.validate(&forged));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = codec();
        assert!(!codec.validate(""));
        assert!(!codec.validate("not-a-token"));
        assert!(!codec.validate("a.b.c"));
        assert!(!codec.validate(&"x".repeat(MAX_TOKEN_LENGTH + 1)));
    }

    #[test]
    fn test_weak_secret_rejected() {
        let err = TokenCodec::new(b"short", Duration::from_secs(60)).unwrap_err();
        assert_eq!(
            err,
            AuthError::WeakSecret {
                actual: 5,
                minimum: MIN_SECRET_LENGTH
            }
        );
    }

    #[test]
    fn test_base64_secret() {
        let encoded = STANDARD.encode(SECRET);
        let from_b64 = TokenCodec::from_base64_secret(&encoded, Duration::from_secs(60)).unwrap();
        let token = codec().generate_token(&principal()).unwrap();
        assert!(from_b64.validate(&token));

        assert!(matches!(
            TokenCodec::from_base64_secret("***", Duration::from_secs(60)),
            Err(AuthError::Signing(_))
        ));
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", codec());
        assert!(rendered.contains("TokenCodec"));
        assert!(!rendered.contains("test_secret"));
    }
}
