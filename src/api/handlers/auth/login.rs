//! `POST /auth/login`.

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
    cookies::{access_token_cookie, refresh_token_cookie},
    state::AuthState,
    types::{LoginRequest, LoginResponse},
};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, token pair issued", body = LoginResponse),
        (status = 400, description = "Missing payload", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let user = match auth_state
        .validator()
        .authenticate(&request.email, &request.password)
        .await
    {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let pair = match auth_state.rotator().login(&user, Utc::now()).await {
        Ok(pair) => pair,
        Err(err) => return err.into_response(),
    };

    let config = auth_state.config();
    let mut headers = HeaderMap::new();
    match (
        access_token_cookie(config, &pair.access.token),
        refresh_token_cookie(config, &pair.refresh.token),
    ) {
        (Ok(access), Ok(refresh)) => {
            headers.append(SET_COOKIE, access);
            headers.append(SET_COOKIE, refresh);
        }
        (Err(err), _) | (_, Err(err)) => {
            error!("Failed to build token cookies: {err}");
        }
    }

    let response = LoginResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        roles: pair.roles,
        access_token_expires_in_minutes: config.access_token_validity_minutes(),
        refresh_token_expires_in_days: config.refresh_token_validity_days(),
    };
    (StatusCode::OK, headers, Json(response)).into_response()
}
