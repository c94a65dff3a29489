//! `POST /auth/refresh-token`.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    cookies::{access_token_cookie, extract_cookie, refresh_token_cookie},
    state::AuthState,
    types::{RefreshRequest, RefreshResponse},
};
use crate::auth::AuthError;

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body(content = RefreshRequest, description = "Optional when the refresh cookie is sent"),
    responses(
        (status = 200, description = "Refresh token rotated", body = RefreshResponse),
        (status = 401, description = "Unknown, expired or already used refresh token", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    // The body wins over the cookie when both are present.
    let presented = payload
        .and_then(|Json(body)| body.refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(|| extract_cookie(&headers, auth_state.config().refresh_token_cookie_name()));

    let Some(presented) = presented else {
        return AuthError::InvalidOrExpiredToken.into_response();
    };

    let pair = match auth_state.rotator().rotate(&presented, Utc::now()).await {
        Ok(pair) => pair,
        Err(err) => return err.into_response(),
    };

    let config = auth_state.config();
    let mut response_headers = HeaderMap::new();
    match (
        access_token_cookie(config, &pair.access.token),
        refresh_token_cookie(config, &pair.refresh.token),
    ) {
        (Ok(access), Ok(refresh)) => {
            response_headers.append(SET_COOKIE, access);
            response_headers.append(SET_COOKIE, refresh);
        }
        (Err(err), _) | (_, Err(err)) => {
            error!("Failed to build token cookies: {err}");
        }
    }

    let response = RefreshResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}
