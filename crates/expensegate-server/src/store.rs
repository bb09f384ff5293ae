//! In-memory account store
//!
//! Wraps a [`MemoryPrincipalStore`] with password credentials and the
//! username uniqueness rule needed by sign-up. Passwords are stored as
//! Argon2id PHC strings; hashing and verification run on the blocking pool.

use std::sync::{Arc, LazyLock};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use expensegate_auth::{AuthResult, MemoryPrincipalStore, Principal, PrincipalStore, Role};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Sign-up failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// Email already belongs to an account
    #[error("Email already registered")]
    EmailTaken,
    /// Username already belongs to an account
    #[error("Username already registered")]
    UsernameTaken,
    /// The password could not be hashed
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Verified against when the email is unknown, so both paths cost one hash
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("expensegate-dummy-password").ok());

#[derive(Debug, Clone)]
struct Credential {
    phc: String,
    created_at: DateTime<Utc>,
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hashing(e.to_string()))
}

fn verify_phc(phc: &str, password: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

async fn blocking<T, F>(f: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "Password task failed");
            None
        }
    }
}

/// Registered account as returned by sign-up
#[derive(Debug, Clone)]
pub struct Account {
    pub principal: Arc<Principal>,
    pub created_at: DateTime<Utc>,
}

/// Accounts keyed by email, with credentials by principal id
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    principals: MemoryPrincipalStore,
    usernames: Arc<DashMap<String, Uuid>>,
    credentials: Arc<DashMap<Uuid, Credential>>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account with the default role
    ///
    /// # Errors
    ///
    /// Returns [`AccountError`] when the email or username is already taken,
    /// or the password cannot be hashed.
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AccountError> {
        self.register(username, email, password, Role::User).await
    }

    /// Register a new account with an explicit role
    ///
    /// # Errors
    ///
    /// Returns [`AccountError`] when the email or username is already taken,
    /// or the password cannot be hashed.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Account, AccountError> {
        let password = password.to_string();
        let phc = blocking(move || hash_password(&password))
            .await
            .ok_or_else(|| AccountError::Hashing("hashing task failed".into()))??;

        let principal = Principal::new(username, email, role);
        let id = principal.id;

        match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => {
                warn!(username, "Signup failed: Username already registered");
                return Err(AccountError::UsernameTaken);
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let created_at = Utc::now();
        self.credentials.insert(id, Credential { phc, created_at });

        let Some(principal) = self.principals.insert_new(principal) else {
            self.usernames.remove(username);
            self.credentials.remove(&id);
            warn!(email, "Signup failed: Email already registered");
            return Err(AccountError::EmailTaken);
        };

        info!(user_id = %id, email, "User registered successfully");
        Ok(Account {
            principal,
            created_at,
        })
    }

    /// Check an email/password pair
    ///
    /// Returns the principal when the password matches.
    pub async fn verify_password(&self, email: &str, password: &str) -> Option<Arc<Principal>> {
        let found = self.principals.load_by_email(email).await.ok();
        let phc = found
            .as_ref()
            .and_then(|p| self.credentials.get(&p.id).map(|c| c.phc.clone()));

        let password = password.to_string();
        let matches = blocking(move || match phc {
            Some(phc) => verify_phc(&phc, &password),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    std::hint::black_box(verify_phc(dummy, &password));
                }
                false
            }
        })
        .await
        .unwrap_or(false);

        found.filter(|_| matches)
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Whether no accounts exist
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait]
impl PrincipalStore for AccountStore {
    async fn load_by_email(&self, email: &str) -> AuthResult<Arc<Principal>> {
        self.principals.load_by_email(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_and_verify() {
        let store = AccountStore::new();
        let account = store
            .sign_up("kate", "kate@example.com", "Secret12!")
            .await
            .unwrap();
        assert_eq!(account.principal.role, Role::User);

        let found = store.verify_password("kate@example.com", "Secret12!").await;
        assert!(Arc::ptr_eq(&found.unwrap(), &account.principal));

        assert!(store.verify_password("kate@example.com", "secret12!").await.is_none());
        assert!(store.verify_password("nobody@example.com", "Secret12!").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let store = AccountStore::new();
        store.sign_up("liam", "liam@example.com", "Secret12!").await.unwrap();

        assert_eq!(
            store
                .sign_up("liam", "other@example.com", "Secret12!")
                .await
                .unwrap_err(),
            AccountError::UsernameTaken
        );
        assert_eq!(
            store
                .sign_up("liam2", "liam@example.com", "Secret12!")
                .await
                .unwrap_err(),
            AccountError::EmailTaken
        );

        // the failed email attempt released its username
        assert!(store.sign_up("liam2", "liam2@example.com", "Secret12!").await.is_ok());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_passwords_stored_as_argon2id_phc() {
        let store = AccountStore::new();
        let account = store
            .sign_up("mona", "mona@example.com", "Secret12!")
            .await
            .unwrap();

        let phc = store.credentials.get(&account.principal.id).unwrap().phc.clone();
        assert!(phc.starts_with("$argon2id$"));
        assert!(!phc.contains("Secret12!"));

        let parsed = PasswordHash::new(&phc).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"Secret12!", &parsed)
                .is_ok()
        );
    }

    #[test]
    fn test_same_password_different_hash() {
        let a = hash_password("Secret12!").unwrap();
        let b = hash_password("Secret12!").unwrap();
        assert_ne!(a, b);
        assert!(verify_phc(&a, "Secret12!"));
        assert!(!verify_phc(&a, "Secret12?"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_phc("not-a-phc-string", "Secret12!"));
        assert!(DUMMY_HASH.is_some());
    }

    #[tokio::test]
    async fn test_principal_store_delegation() {
        let store = AccountStore::new();
        let account = store
            .register("mia", "mia@example.com", "Secret12!", Role::Admin)
            .await
            .unwrap();

        let loaded = store.load_by_email("mia@example.com").await.unwrap();
        assert_eq!(loaded.id, account.principal.id);
        assert_eq!(loaded.role, Role::Admin);
    }
}
