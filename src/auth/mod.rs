//! Server-side token lifecycle: credential checks, token issuance, refresh rotation.
//!
//! Nothing here knows about HTTP beyond [`AuthError`]'s response mapping; the handlers
//! in [`crate::api`] translate requests into calls on [`CredentialValidator`],
//! [`RefreshRotator`] and [`TokenIssuer`].

mod config;
mod error;
mod password;
mod rotator;
mod store;
mod token;
mod utils;
mod validator;

pub use config::{
    AuthConfig, DEFAULT_ACCESS_TOKEN_COOKIE_NAME, DEFAULT_ACCESS_TOKEN_VALIDITY_MINUTES,
    DEFAULT_FRONTEND_BASE_URL, DEFAULT_REFRESH_TOKEN_COOKIE_NAME,
    DEFAULT_REFRESH_TOKEN_VALIDITY_DAYS, MAX_ACCESS_TOKEN_VALIDITY_MINUTES,
    MAX_REFRESH_TOKEN_VALIDITY_DAYS, MIN_SIGNING_KEY_BYTES,
};
pub use error::{AuthError, INVALID_CREDENTIALS_MESSAGE, UNAUTHORIZED_MESSAGE};
pub use password::{hash_password, verify_password};
pub use rotator::RefreshRotator;
pub use store::{
    CredentialStore, MemoryCredentialStore, PgCredentialStore, RefreshTokenUpdate, StoreFuture,
    UserCredential,
};
pub use token::{AccessTokenClaims, IssuedAccessToken, IssuedRefreshToken, TokenIssuer, TokenPair};
pub use utils::{hash_refresh_token, normalize_email, MAX_REFRESH_TOKEN_LEN};
pub use validator::CredentialValidator;
