//! Access token validation for protected routes.
//!
//! Flow Overview: read the bearer value from `Authorization`, or from the access-token
//! cookie only when that header is absent, verify it, and insert a [`Principal`] into the
//! request extensions. No store lookup happens here: a token stays usable until its `exp`
//! even if the user's roles change in the meantime.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{
    cookies::{extract_bearer_token, extract_cookie, BearerHeader},
    state::AuthState,
};
use crate::auth::{AccessTokenClaims, AuthError};

/// Authenticated caller derived from a verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|granted| granted == role)
    }

    fn from_claims(claims: AccessTokenClaims) -> Option<Self> {
        Some(Self {
            expires_at: claims.expires_at()?,
            user_id: claims.uid,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
        })
    }
}

/// Resolve the request's access token into a principal.
///
/// # Errors
/// [`AuthError::InvalidOrExpiredToken`] for a missing, malformed or unverifiable token.
pub fn authenticate_request(
    state: &AuthState,
    headers: &axum::http::HeaderMap,
    now: DateTime<Utc>,
) -> Result<Principal, AuthError> {
    let token = match extract_bearer_token(headers) {
        BearerHeader::Token(token) => token,
        BearerHeader::Malformed => {
            debug!("Rejected malformed Authorization header");
            return Err(AuthError::InvalidOrExpiredToken);
        }
        BearerHeader::Absent => extract_cookie(headers, state.config().access_token_cookie_name())
            .ok_or(AuthError::InvalidOrExpiredToken)?,
    };

    let claims = state.issuer().verify_access_token(&token, now)?;
    Principal::from_claims(claims).ok_or(AuthError::InvalidOrExpiredToken)
}

/// Middleware guarding protected routes; answers `401 Unauthorized` on any failure.
pub async fn require_access_token(
    auth_state: Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate_request(&auth_state, request.headers(), Utc::now()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(roles: &[&str]) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            roles: roles.iter().map(ToString::to_string).collect(),
            token_id: "jti".to_string(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn has_role_is_exact() {
        let p = principal(&["admin", "editor"]);
        assert!(p.has_role("admin"));
        assert!(p.has_role("editor"));
        assert!(!p.has_role("Admin"));
        assert!(!principal(&[]).has_role("admin"));
    }
}
