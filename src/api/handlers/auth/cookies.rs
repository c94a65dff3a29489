//! `Set-Cookie` builders and cookie/bearer extraction.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};

use crate::auth::AuthConfig;

/// Result of reading the `Authorization` header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BearerHeader {
    Absent,
    Malformed,
    Token(String),
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> BearerHeader {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return BearerHeader::Absent;
    };
    let Ok(value) = value.to_str() else {
        return BearerHeader::Malformed;
    };
    let Some((scheme, token)) = value.trim().split_once(' ') else {
        return BearerHeader::Malformed;
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return BearerHeader::Malformed;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        BearerHeader::Malformed
    } else {
        BearerHeader::Token(token.to_string())
    }
}

pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

fn build_cookie(
    config: &AuthConfig,
    name: &str,
    value: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    // Only mark cookies secure when the frontend is served over HTTPS.
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn access_token_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(
        config,
        config.access_token_cookie_name(),
        token,
        config.access_token_ttl().num_seconds(),
    )
}

pub(crate) fn refresh_token_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(
        config,
        config.refresh_token_cookie_name(),
        token,
        config.refresh_token_ttl().num_seconds(),
    )
}

pub(crate) fn clear_cookies(config: &AuthConfig) -> Vec<HeaderValue> {
    [
        config.access_token_cookie_name(),
        config.refresh_token_cookie_name(),
    ]
    .into_iter()
    .filter_map(|name| build_cookie(config, name, "", 0).ok())
    .collect()
}
