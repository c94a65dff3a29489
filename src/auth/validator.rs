//! Email/password authentication.

use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    error::AuthError,
    password::{verify_dummy, verify_password},
    store::{CredentialStore, UserCredential},
    utils::normalize_email,
};

#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn CredentialStore>,
}

impl CredentialValidator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Check `email`/`password` against the store.
    ///
    /// Unknown account, unconfirmed email and wrong password all return
    /// [`AuthError::InvalidCredentials`], and each of them runs one password verification.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] on any credential mismatch,
    /// [`AuthError::Internal`] if the store fails.
    #[instrument(skip(self, email, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserCredential, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.store.find_by_email(&email).await? else {
            verify_dummy(password);
            debug!("Login rejected: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            debug!("Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.email_confirmed {
            debug!("Login rejected: email not confirmed");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
