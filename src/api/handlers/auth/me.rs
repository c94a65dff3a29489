//! `GET /auth/me`.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use super::{principal::Principal, types::MeResponse};

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Claims of the presented access token", body = MeResponse),
        (status = 401, description = "Missing, malformed or expired access token", body = String)
    ),
    tag = "auth"
)]
pub async fn me(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    let response = MeResponse {
        user_id: principal.user_id,
        email: principal.email,
        roles: principal.roles,
        expires_at: principal.expires_at,
    };
    (StatusCode::OK, Json(response))
}
