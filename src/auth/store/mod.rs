//! Credential persistence.
//!
//! The store holds one row per user with a password hash, roles and the single active
//! refresh token (as a SHA-256 digest) plus its expiry. The only operation with real
//! concurrency requirements is [`CredentialStore::rotate_refresh_token`], which must be
//! one check-and-set against the store, never a read followed by a separate write.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin};
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredential {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) and unique.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub email_confirmed: bool,
    pub roles: Vec<String>,
    pub refresh_token_hash: Option<Vec<u8>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl UserCredential {
    #[must_use]
    pub fn new(email: &str, password_hash: String, roles: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: super::utils::normalize_email(email),
            password_hash,
            email_confirmed: true,
            roles,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
        }
    }

    #[must_use]
    pub fn unconfirmed(mut self) -> Self {
        self.email_confirmed = false;
        self
    }
}

/// Replacement refresh token written by a successful rotation.
#[derive(Clone, Debug)]
pub struct RefreshTokenUpdate<'a> {
    pub presented_hash: &'a [u8],
    pub new_hash: &'a [u8],
    pub new_expires_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email.
    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserCredential>>;

    /// Unconditionally replace the user's refresh token (login).
    ///
    /// Returns `false` if the user no longer exists.
    fn set_refresh_token<'a>(
        &'a self,
        user_id: Uuid,
        token_hash: &'a [u8],
        expires_at: DateTime<Utc>,
    ) -> StoreFuture<'a, bool>;

    /// Replace the refresh token only if `presented_hash` is the current one and it has
    /// not expired at `now`, returning the owner as it looks after the update.
    ///
    /// `None` covers unknown, expired and already-rotated tokens alike.
    fn rotate_refresh_token<'a>(
        &'a self,
        update: RefreshTokenUpdate<'a>,
    ) -> StoreFuture<'a, Option<UserCredential>>;

    /// Cheap liveness probe for the health endpoint.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
