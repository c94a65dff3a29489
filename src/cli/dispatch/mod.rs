use crate::{
    auth::AuthConfig,
    cli::{
        actions::{server::Args, Action},
        commands::auth as auth_args,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or the auth settings are unusable.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_config = auth_config(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        auth_config,
    }))
}

fn auth_config(matches: &clap::ArgMatches) -> Result<AuthConfig> {
    let get = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing required argument: --{name}"))
    };

    let signing_key = SecretString::from(get(auth_args::ARG_SIGNING_KEY)?);
    let mut config = AuthConfig::new(
        get(auth_args::ARG_ISSUER)?,
        get(auth_args::ARG_AUDIENCE)?,
        signing_key,
    )?
    .with_access_token_cookie_name(get(auth_args::ARG_ACCESS_TOKEN_COOKIE_NAME)?)
    .with_refresh_token_cookie_name(get(auth_args::ARG_REFRESH_TOKEN_COOKIE_NAME)?)
    .with_frontend_base_url(get(auth_args::ARG_FRONTEND_BASE_URL)?);

    if let Some(minutes) = matches
        .get_one::<u32>(auth_args::ARG_ACCESS_TOKEN_VALIDITY_MINUTES)
        .copied()
    {
        config = config.with_access_token_validity_minutes(minutes);
    }
    if let Some(days) = matches
        .get_one::<u32>(auth_args::ARG_REFRESH_TOKEN_VALIDITY_DAYS)
        .copied()
    {
        config = config.with_refresh_token_validity_days(days);
    }

    config.validate()?;
    Ok(config)
}
