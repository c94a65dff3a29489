//! # Tokenward (access/refresh token lifecycle)
//!
//! `tokenward` authenticates users and hands out two credentials: a short-lived signed
//! access token (HS256 JWT) and an opaque, rotating refresh token.
//!
//! ## Server side
//!
//! - **Login:** [`auth::CredentialValidator`] checks email and password against a
//!   [`auth::CredentialStore`]. Every failure (unknown account, unconfirmed email, wrong
//!   password) yields the same [`auth::AuthError::InvalidCredentials`].
//! - **Refresh:** [`auth::RefreshRotator`] swaps the presented refresh token for a new pair
//!   with a single conditional update in the store. The old value is dead the moment the
//!   update commits; a duplicate submission loses the race and gets `401`.
//! - **Validation:** protected routes run behind [`api::require_access_token`], which
//!   verifies signature, issuer, audience and expiry with zero leeway. It never consults
//!   the store, so an issued access token lives until its `exp`.
//!
//! ## Client side
//!
//! [`client::RefreshCoordinator`] wraps a [`client::Transport`] and guarantees that only
//! one refresh call is in flight per client session. Concurrent requests that hit `401`
//! queue behind it and are replayed at most once.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
