//! Token issuance configuration.

use secrecy::{ExposeSecret, SecretString};

use super::error::AuthError;

pub const DEFAULT_ACCESS_TOKEN_VALIDITY_MINUTES: u32 = 5;
pub const DEFAULT_REFRESH_TOKEN_VALIDITY_DAYS: u32 = 7;
pub const DEFAULT_ACCESS_TOKEN_COOKIE_NAME: &str = "access_token";
pub const DEFAULT_REFRESH_TOKEN_COOKIE_NAME: &str = "refresh_token";
/// One day; longer access tokens defeat the point of refreshing.
pub const MAX_ACCESS_TOKEN_VALIDITY_MINUTES: u32 = 1440;
/// Ten years.
pub const MAX_REFRESH_TOKEN_VALIDITY_DAYS: u32 = 3650;
pub const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";
/// HS256 keys shorter than the digest size weaken the MAC.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    issuer: String,
    audience: String,
    signing_key: SecretString,
    access_token_cookie_name: String,
    refresh_token_cookie_name: String,
    access_token_validity_minutes: u32,
    refresh_token_validity_days: u32,
    frontend_base_url: String,
}

impl AuthConfig {
    /// Build a config from the three settings the server cannot run without.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] when any of them is empty or the signing key
    /// is shorter than [`MIN_SIGNING_KEY_BYTES`].
    pub fn new(
        issuer: String,
        audience: String,
        signing_key: SecretString,
    ) -> Result<Self, AuthError> {
        if issuer.trim().is_empty() {
            return Err(AuthError::Configuration("issuer is required".to_string()));
        }
        if audience.trim().is_empty() {
            return Err(AuthError::Configuration("audience is required".to_string()));
        }
        let key_len = signing_key.expose_secret().len();
        if key_len == 0 {
            return Err(AuthError::Configuration(
                "signing key is required".to_string(),
            ));
        }
        if key_len < MIN_SIGNING_KEY_BYTES {
            return Err(AuthError::Configuration(format!(
                "signing key must be at least {MIN_SIGNING_KEY_BYTES} bytes, got {key_len}"
            )));
        }

        Ok(Self {
            issuer,
            audience,
            signing_key,
            access_token_cookie_name: DEFAULT_ACCESS_TOKEN_COOKIE_NAME.to_string(),
            refresh_token_cookie_name: DEFAULT_REFRESH_TOKEN_COOKIE_NAME.to_string(),
            access_token_validity_minutes: DEFAULT_ACCESS_TOKEN_VALIDITY_MINUTES,
            refresh_token_validity_days: DEFAULT_REFRESH_TOKEN_VALIDITY_DAYS,
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_access_token_cookie_name(mut self, name: String) -> Self {
        self.access_token_cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_refresh_token_cookie_name(mut self, name: String) -> Self {
        self.refresh_token_cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_access_token_validity_minutes(mut self, minutes: u32) -> Self {
        self.access_token_validity_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_refresh_token_validity_days(mut self, days: u32) -> Self {
        self.refresh_token_validity_days = days;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, url: String) -> Self {
        self.frontend_base_url = url;
        self
    }

    /// Check the settings that the `with_*` builders can break.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] for lifetimes outside
    /// `1..=MAX_*_VALIDITY_*` or empty cookie names.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !(1..=MAX_ACCESS_TOKEN_VALIDITY_MINUTES).contains(&self.access_token_validity_minutes) {
            return Err(AuthError::Configuration(format!(
                "access token validity must be between 1 and {MAX_ACCESS_TOKEN_VALIDITY_MINUTES} minutes"
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_VALIDITY_DAYS).contains(&self.refresh_token_validity_days) {
            return Err(AuthError::Configuration(format!(
                "refresh token validity must be between 1 and {MAX_REFRESH_TOKEN_VALIDITY_DAYS} days"
            )));
        }
        if self.access_token_cookie_name.trim().is_empty()
            || self.refresh_token_cookie_name.trim().is_empty()
        {
            return Err(AuthError::Configuration(
                "cookie names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        self.signing_key.expose_secret().as_bytes()
    }

    #[must_use]
    pub fn access_token_cookie_name(&self) -> &str {
        &self.access_token_cookie_name
    }

    #[must_use]
    pub fn refresh_token_cookie_name(&self) -> &str {
        &self.refresh_token_cookie_name
    }

    #[must_use]
    pub fn access_token_validity_minutes(&self) -> u32 {
        self.access_token_validity_minutes
    }

    #[must_use]
    pub fn refresh_token_validity_days(&self) -> u32 {
        self.refresh_token_validity_days
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.access_token_validity_minutes))
    }

    #[must_use]
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.refresh_token_validity_days))
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn config() -> Result<AuthConfig, AuthError> {
        AuthConfig::new(
            "https://auth.tokenward.dev".to_string(),
            "tokenward".to_string(),
            SecretString::from(KEY.to_string()),
        )
    }

    #[test]
    fn defaults_apply() -> Result<(), AuthError> {
        let config = config()?;
        assert_eq!(config.access_token_validity_minutes(), 5);
        assert_eq!(config.refresh_token_validity_days(), 7);
        assert_eq!(config.access_token_cookie_name(), "access_token");
        assert_eq!(config.refresh_token_cookie_name(), "refresh_token");
        assert!(!config.cookie_secure());
        config.validate()
    }

    #[test]
    fn missing_signing_key_is_fatal() {
        let result = AuthConfig::new(
            "issuer".to_string(),
            "audience".to_string(),
            SecretString::default(),
        );
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn short_signing_key_is_fatal() {
        let result = AuthConfig::new(
            "issuer".to_string(),
            "audience".to_string(),
            SecretString::from("too-short".to_string()),
        );
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn missing_issuer_or_audience_is_fatal() {
        let key = || SecretString::from(KEY.to_string());
        assert!(AuthConfig::new(" ".to_string(), "aud".to_string(), key()).is_err());
        assert!(AuthConfig::new("iss".to_string(), String::new(), key()).is_err());
    }

    #[test]
    fn zero_validity_is_rejected() -> Result<(), AuthError> {
        let config = config()?.with_access_token_validity_minutes(0);
        assert!(config.validate().is_err());
        let config = self::config()?.with_refresh_token_validity_days(0);
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn oversized_validity_is_rejected() -> Result<(), AuthError> {
        let config = config()?.with_refresh_token_validity_days(u32::MAX);
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));
        let config = self::config()?.with_access_token_validity_minutes(u32::MAX);
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));

        let config = self::config()?
            .with_access_token_validity_minutes(MAX_ACCESS_TOKEN_VALIDITY_MINUTES)
            .with_refresh_token_validity_days(MAX_REFRESH_TOKEN_VALIDITY_DAYS);
        config.validate()
    }

    #[test]
    fn https_frontend_marks_cookies_secure() -> Result<(), AuthError> {
        let config = config()?.with_frontend_base_url("https://app.tokenward.dev".to_string());
        assert!(config.cookie_secure());
        Ok(())
    }
}
