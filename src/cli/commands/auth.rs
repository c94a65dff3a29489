use clap::{Arg, Command};

use crate::auth::{
    DEFAULT_ACCESS_TOKEN_COOKIE_NAME, DEFAULT_FRONTEND_BASE_URL,
    DEFAULT_REFRESH_TOKEN_COOKIE_NAME, MAX_ACCESS_TOKEN_VALIDITY_MINUTES,
    MAX_REFRESH_TOKEN_VALIDITY_DAYS,
};

pub const ARG_ISSUER: &str = "issuer";
pub const ARG_AUDIENCE: &str = "audience";
pub const ARG_SIGNING_KEY: &str = "signing-key";
pub const ARG_ACCESS_TOKEN_COOKIE_NAME: &str = "access-token-cookie-name";
pub const ARG_REFRESH_TOKEN_COOKIE_NAME: &str = "refresh-token-cookie-name";
pub const ARG_ACCESS_TOKEN_VALIDITY_MINUTES: &str = "access-token-validity-minutes";
pub const ARG_REFRESH_TOKEN_VALIDITY_DAYS: &str = "refresh-token-validity-days";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Issuer (iss) written into and required from access tokens")
                .env("TOKENWARD_ISSUER")
                .required(true),
        )
        .arg(
            Arg::new(ARG_AUDIENCE)
                .long(ARG_AUDIENCE)
                .help("Audience (aud) written into and required from access tokens")
                .env("TOKENWARD_AUDIENCE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SIGNING_KEY)
                .long(ARG_SIGNING_KEY)
                .help("HS256 signing key, at least 32 bytes")
                .env("TOKENWARD_SIGNING_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_COOKIE_NAME)
                .long(ARG_ACCESS_TOKEN_COOKIE_NAME)
                .help("Cookie carrying the access token")
                .env("TOKENWARD_ACCESS_TOKEN_COOKIE_NAME")
                .default_value(DEFAULT_ACCESS_TOKEN_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_COOKIE_NAME)
                .long(ARG_REFRESH_TOKEN_COOKIE_NAME)
                .help("Cookie carrying the refresh token")
                .env("TOKENWARD_REFRESH_TOKEN_COOKIE_NAME")
                .default_value(DEFAULT_REFRESH_TOKEN_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_VALIDITY_MINUTES)
                .long(ARG_ACCESS_TOKEN_VALIDITY_MINUTES)
                .help("Access token lifetime in minutes")
                .env("TOKENWARD_ACCESS_TOKEN_VALIDITY_MINUTES")
                .default_value("5")
                .value_parser(
                    clap::value_parser!(u32)
                        .range(1..=i64::from(MAX_ACCESS_TOKEN_VALIDITY_MINUTES)),
                ),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_VALIDITY_DAYS)
                .long(ARG_REFRESH_TOKEN_VALIDITY_DAYS)
                .help("Refresh token lifetime in days")
                .env("TOKENWARD_REFRESH_TOKEN_VALIDITY_DAYS")
                .default_value("7")
                .value_parser(
                    clap::value_parser!(u32).range(1..=i64::from(MAX_REFRESH_TOKEN_VALIDITY_DAYS)),
                ),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend origin allowed by CORS; https also marks cookies Secure")
                .env("TOKENWARD_FRONTEND_BASE_URL")
                .default_value(DEFAULT_FRONTEND_BASE_URL),
        )
}
