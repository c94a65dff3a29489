//! Shared state handed to every auth handler through `Extension<Arc<AuthState>>`.

use std::sync::Arc;

use crate::auth::{AuthConfig, CredentialStore, CredentialValidator, RefreshRotator, TokenIssuer};

pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
    validator: CredentialValidator,
    rotator: RefreshRotator,
    store: Arc<dyn CredentialStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>) -> Self {
        let issuer = TokenIssuer::new(&config);
        Self {
            validator: CredentialValidator::new(store.clone()),
            rotator: RefreshRotator::new(store.clone(), issuer.clone()),
            issuer,
            config,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    #[must_use]
    pub fn rotator(&self) -> &RefreshRotator {
        &self.rotator
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }
}
