//! Client-side error taxonomy.

use thiserror::Error;

/// Why a refresh did not produce a usable token pair.
///
/// `Clone` so one outcome can be handed to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    /// The server answered `401`: unknown, expired or already rotated refresh token.
    #[error("refresh token rejected")]
    Rejected,
    #[error("refresh timed out")]
    TimedOut,
    /// No refresh token is held; the client never logged in.
    #[error("no refresh token available")]
    MissingRefreshToken,
    /// The task performing the refresh was dropped before it finished.
    #[error("refresh abandoned")]
    Abandoned,
    #[error("refresh transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Refresh(#[from] RefreshFailure),
    /// An earlier refresh failed terminally; log in again.
    #[error("session expired")]
    SessionExpired,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("client state lock poisoned")]
    Lock,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl ClientError {
    /// True when the caller should drop local state and send the user to login.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Refresh(_) | Self::SessionExpired | Self::InvalidCredentials
        )
    }
}
