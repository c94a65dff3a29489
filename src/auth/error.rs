//! Error taxonomy for login, refresh and access-token validation.
//!
//! Responses are deliberately coarse: every credential failure maps to the same
//! `401` body and every token failure to another fixed `401` body, so a caller can
//! never learn which check rejected it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown account, unconfirmed email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Bad signature, bad claims, expired token, or unknown/expired/reused refresh token.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    /// Missing or unusable signing configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text sent to the client.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE,
            Self::InvalidOrExpiredToken => UNAUTHORIZED_MESSAGE,
            Self::Configuration(_) | Self::Internal(_) => INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Configuration(_) | Self::Internal(_) = &self {
            error!("Auth request failed: {self:#}");
        }
        (self.status(), self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_and_token_failures_are_unauthorized() {
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidOrExpiredToken.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused to db-1:5432"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
