//! Access token signing/verification and refresh token minting.
//!
//! Access tokens are HS256 JWTs. Verification pins the algorithm, issuer and audience,
//! and checks `exp` against the caller's clock with zero leeway: a token is valid while
//! `now <= exp` and rejected from the next second on.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{
    config::AuthConfig,
    error::AuthError,
    store::UserCredential,
    utils::{generate_refresh_token, hash_refresh_token},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// The user's email.
    pub sub: String,
    pub uid: Uuid,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessTokenClaims {
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted refresh token. Only `hash` is ever persisted.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

/// Everything login and refresh hand back to the client.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedAccessToken,
    pub refresh: IssuedRefreshToken,
    pub roles: Vec<String>,
}

fn expiry(now: DateTime<Utc>, ttl: chrono::Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl).ok_or_else(|| {
        AuthError::Internal(anyhow::anyhow!("token expiry out of range: {now} + {ttl}"))
    })
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer()]);
        validation.set_audience(&[config.audience()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;
        // Expiry is checked against the caller's clock in `verify_access_token`.
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(config.signing_key()),
            decoding: DecodingKey::from_secret(config.signing_key()),
            validation,
            issuer: config.issuer().to_string(),
            audience: config.audience().to_string(),
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
        }
    }

    /// Sign an access token for `user` valid until `now + access ttl`.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if signing fails or the expiry is out of range.
    pub fn issue_access_token(
        &self,
        user: &UserCredential,
        now: DateTime<Utc>,
    ) -> Result<IssuedAccessToken, AuthError> {
        let expires_at = expiry(now, self.access_ttl)?;
        let jti = Uuid::new_v4().to_string();
        let claims = AccessTokenClaims {
            sub: user.email.clone(),
            uid: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            jti: jti.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| anyhow::Error::new(err).context("failed to sign access token"))?;

        Ok(IssuedAccessToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Mint an opaque refresh token valid until `now + refresh ttl`.
    ///
    /// # Errors
    /// Returns [`AuthError::Internal`] if the OS random source fails.
    pub fn issue_refresh_token(
        &self,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let token = generate_refresh_token()?;
        let hash = hash_refresh_token(&token);
        Ok(IssuedRefreshToken {
            token,
            hash,
            expires_at: expiry(now, self.refresh_ttl)?,
        })
    }

    /// Issue both tokens for `user`.
    ///
    /// # Errors
    /// Propagates signing and randomness failures.
    pub fn issue_pair(
        &self,
        user: &UserCredential,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue_access_token(user, now)?,
            refresh: self.issue_refresh_token(now)?,
            roles: user.roles.clone(),
        })
    }

    /// Verify signature, issuer, audience and expiry.
    ///
    /// # Errors
    /// Every failure is [`AuthError::InvalidOrExpiredToken`]; the reason is only logged.
    pub fn verify_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenClaims, AuthError> {
        let claims = decode::<AccessTokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| {
                debug!("Access token rejected: {err}");
                AuthError::InvalidOrExpiredToken
            })?
            .claims;

        if claims.exp < now.timestamp() {
            debug!("Access token rejected: expired at {}", claims.exp);
            return Err(AuthError::InvalidOrExpiredToken);
        }
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        Ok(claims)
    }
}
