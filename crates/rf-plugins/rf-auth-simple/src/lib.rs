//! # rf-auth-simple
//!
//! Argon2 password hashing, an in-memory session registry and the
//! registration/login flow built on top of the `Store`.

use std::sync::Arc;

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use dashmap::DashMap;
use rf_core::validation::{normalize_username, validate_email};
use rf_core::{PasswordHasher, SessionRegistry, Store, StoreError, User, UserId, UserOptions};
use thiserror::Error;
use tracing::{debug, info};

/// Bytes of randomness per session token, hex-encoded on the wire.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong password; the two are not told apart.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> rf_core::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Backend(anyhow!("password hashing failed: {e}")))
    }

    /// Malformed hashes never verify.
    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Token to username map. Built once at startup and shared by reference.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionRegistry for SessionStore {
    fn check_auth(&self, token: &str) -> Option<String> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    fn create_session(&self, username: &str) -> rf_core::Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| StoreError::Backend(anyhow!("no randomness for session token: {e}")))?;
        let token = hex::encode(bytes);
        self.sessions.insert(token.clone(), username.to_string());
        Ok(token)
    }

    fn logout(&self, token: &str) {
        self.sessions.remove(token);
    }
}

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
}

/// Registration and login over a `Store`.
pub struct Accounts {
    store: Store,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn SessionRegistry>,
}

impl Accounts {
    pub fn new(store: Store, hasher: Arc<dyn PasswordHasher>, sessions: Arc<dyn SessionRegistry>) -> Self {
        Self { store, hasher, sessions }
    }

    /// Normalizes the username, checks the email and stores a hashed password.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AuthError> {
        let username = normalize_username(username);
        validate_email(email)?;
        if password.is_empty() {
            return Err(StoreError::InvalidInput("password must not be empty".into()).into());
        }

        let password_hash = self.hasher.hash(password)?;
        let options = UserOptions::default().display_name(display_name);
        let user = self.store.register_user(email, &username, &password_hash, options).await?;
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let user_id = UserId::new(&normalize_username(username));
        let user = match self.store.get_user_by_id(&user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound(..)) => {
                debug!(user_id = %user_id, "login for unknown user");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.hasher.verify(&user.password_hash, password) {
            debug!(user_id = %user_id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.create_session(user_id.username())?;
        info!(user_id = %user_id, "user logged in");
        Ok(Session { token, user_id })
    }

    /// The user behind `token`, if the session is live.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let Some(username) = self.sessions.check_auth(token) else {
            return Ok(None);
        };
        let user = self.store.get_user_by_id(&UserId::new(&username)).await?;
        Ok(Some(user))
    }

    pub fn logout(&self, token: &str) {
        self.sessions.logout(token);
    }
}
