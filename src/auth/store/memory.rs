//! In-memory credential store for tests and embedding.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, RefreshTokenUpdate, StoreFuture, UserCredential};

/// `Clone` shares the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialStore {
    users: Arc<Mutex<HashMap<Uuid, UserCredential>>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, enforcing email uniqueness.
    ///
    /// # Errors
    /// Returns an error if another user already owns the email.
    pub async fn insert(&self, user: UserCredential) -> Result<()> {
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(anyhow!("email already registered"));
        }
        users.insert(user.id, user);
        Ok(())
    }

    pub async fn get(&self, user_id: Uuid) -> Option<UserCredential> {
        self.users.lock().await.get(&user_id).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserCredential>> {
        Box::pin(async move {
            let users = self.users.lock().await;
            Ok(users.values().find(|user| user.email == email).cloned())
        })
    }

    fn set_refresh_token<'a>(
        &'a self,
        user_id: Uuid,
        token_hash: &'a [u8],
        expires_at: DateTime<Utc>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut users = self.users.lock().await;
            let Some(user) = users.get_mut(&user_id) else {
                return Ok(false);
            };
            user.refresh_token_hash = Some(token_hash.to_vec());
            user.refresh_token_expires_at = Some(expires_at);
            Ok(true)
        })
    }

    fn rotate_refresh_token<'a>(
        &'a self,
        update: RefreshTokenUpdate<'a>,
    ) -> StoreFuture<'a, Option<UserCredential>> {
        Box::pin(async move {
            // Check and write under one lock so concurrent rotations serialize.
            let mut users = self.users.lock().await;
            let owner = users.values_mut().find(|user| {
                user.refresh_token_hash.as_deref() == Some(update.presented_hash)
                    && user
                        .refresh_token_expires_at
                        .is_some_and(|expires_at| expires_at > update.now)
            });
            let Some(owner) = owner else {
                return Ok(None);
            };
            owner.refresh_token_hash = Some(update.new_hash.to_vec());
            owner.refresh_token_expires_at = Some(update.new_expires_at);
            Ok(Some(owner.clone()))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
