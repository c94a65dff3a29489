//! `POST /auth/logout`.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use super::{cookies::clear_cookies, state::AuthState};

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Token cookies cleared")
    ),
    tag = "auth"
)]
/// Clear both token cookies. Issued access tokens stay valid until they expire.
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let mut response_headers = HeaderMap::new();
    for cookie in clear_cookies(auth_state.config()) {
        response_headers.append(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
