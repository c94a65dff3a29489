//! Refresh token issuance at login and single-use rotation.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    error::AuthError,
    store::{CredentialStore, RefreshTokenUpdate, UserCredential},
    token::{TokenIssuer, TokenPair},
    utils::{hash_refresh_token, plausible_refresh_token},
};

#[derive(Clone)]
pub struct RefreshRotator {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
}

impl RefreshRotator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    /// Issue a fresh pair for an authenticated user, replacing whatever refresh token
    /// the user held before.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] if the user disappeared between authentication
    /// and this call, [`AuthError::Internal`] on signing or store failures.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn login(
        &self,
        user: &UserCredential,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let pair = self.issuer.issue_pair(user, now)?;
        let stored = self
            .store
            .set_refresh_token(user.id, &pair.refresh.hash, pair.refresh.expires_at)
            .await?;
        if !stored {
            return Err(AuthError::InvalidCredentials);
        }
        info!("Issued token pair");
        Ok(pair)
    }

    /// Exchange `presented` for a new pair.
    ///
    /// The store swaps the token in one conditional update, so of two concurrent calls
    /// with the same value at most one succeeds.
    ///
    /// # Errors
    /// [`AuthError::InvalidOrExpiredToken`] if the value is malformed, unknown, expired or
    /// already rotated.
    #[instrument(skip_all)]
    pub async fn rotate(
        &self,
        presented: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        if !plausible_refresh_token(presented) {
            debug!("Refresh rejected: malformed token");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let presented_hash = hash_refresh_token(presented);
        let replacement = self.issuer.issue_refresh_token(now)?;
        let owner = self
            .store
            .rotate_refresh_token(RefreshTokenUpdate {
                presented_hash: &presented_hash,
                new_hash: &replacement.hash,
                new_expires_at: replacement.expires_at,
                now,
            })
            .await?;

        let Some(owner) = owner else {
            debug!("Refresh rejected: unknown, expired or reused token");
            return Err(AuthError::InvalidOrExpiredToken);
        };

        let access = self.issuer.issue_access_token(&owner, now)?;
        info!(user_id = %owner.id, "Rotated refresh token");
        Ok(TokenPair {
            access,
            refresh: replacement,
            roles: owner.roles,
        })
    }
}
