//! Token storage shared by every coordinator of one client session.
//!
//! Several coordinators may share one [`ClientTokens`] (think browser tabs sharing local
//! storage). Writers always replace the whole pair, so readers never see an access token
//! from one rotation next to a refresh token from another.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use super::error::ClientError;

#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Default)]
struct Slot {
    pair: Option<TokenPair>,
    /// Set when a refresh failed terminally, cleared by the next `set`.
    expired: bool,
}

/// `Clone` shares the same storage.
#[derive(Clone, Debug, Default)]
pub struct ClientTokens {
    slot: Arc<RwLock<Slot>>,
}

impl ClientTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot {
                pair: Some(pair),
                expired: false,
            })),
        }
    }

    /// Store a new pair.
    ///
    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn set(&self, pair: TokenPair) -> Result<(), ClientError> {
        let mut slot = self.slot.write().map_err(|_| ClientError::Lock)?;
        slot.pair = Some(pair);
        slot.expired = false;
        Ok(())
    }

    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn get(&self) -> Result<Option<TokenPair>, ClientError> {
        let slot = self.slot.read().map_err(|_| ClientError::Lock)?;
        Ok(slot.pair.clone())
    }

    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn access_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.get()?.map(|pair| pair.access_token))
    }

    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn refresh_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.get()?.map(|pair| pair.refresh_token))
    }

    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn is_expired(&self) -> Result<bool, ClientError> {
        Ok(self.slot.read().map_err(|_| ClientError::Lock)?.expired)
    }

    /// Forget the pair (logout).
    ///
    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn clear(&self) -> Result<(), ClientError> {
        let mut slot = self.slot.write().map_err(|_| ClientError::Lock)?;
        slot.pair = None;
        slot.expired = false;
        Ok(())
    }

    /// Drop the pair and mark the session expired, but only if it still holds
    /// `refresh_token`; a pair stored meanwhile by someone else is kept.
    ///
    /// Returns whether the pair was dropped.
    ///
    /// # Errors
    /// Returns [`ClientError::Lock`] if the lock is poisoned.
    pub fn expire_if_current(&self, refresh_token: &str) -> Result<bool, ClientError> {
        let mut slot = self.slot.write().map_err(|_| ClientError::Lock)?;
        let current = slot
            .pair
            .as_ref()
            .is_some_and(|pair| pair.refresh_token == refresh_token);
        if current {
            slot.pair = None;
            slot.expired = true;
        }
        Ok(current)
    }
}
