//! The network seam under the coordinator.
//!
//! [`HttpTransport`] talks to a tokenward server with `reqwest`; tests plug in their own
//! [`Transport`] to script status codes and timing.

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{future::Future, pin::Pin, time::Duration};
use tracing::debug;
use url::Url;

use super::{error::ClientError, tokens::TokenPair};

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// A request the coordinator may send twice: once with the current access token and,
/// after a refresh, once more with the new one.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the server base URL, e.g. `/auth/me`.
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// # Errors
    /// Returns [`ClientError::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

/// Session returned by a successful login.
#[derive(Clone, Debug)]
pub struct LoginSession {
    pub tokens: TokenPair,
    pub roles: Vec<String>,
}

pub trait Transport: Send + Sync {
    /// Send `request`, attaching `access_token` as a bearer value when present.
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        access_token: Option<&'a str>,
    ) -> TransportFuture<'a, ApiResponse>;

    /// Exchange a refresh token. `Ok(None)` means the server rejected it.
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, Option<TokenPair>>;

    /// `Ok(None)` means the server rejected the credentials.
    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> TransportFuture<'a, Option<LoginSession>>;

    fn logout(&self) -> TransportFuture<'_, ()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshReply {
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    roles: Vec<String>,
}

/// `reqwest` transport against a tokenward server.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|err| ClientError::Transport(err.to_string()))?;
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Transport(format!("invalid path {path}: {err}")))
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        access_token: Option<&'a str>,
    ) -> TransportFuture<'a, ApiResponse> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.clone(), self.url(&request.path)?);
            if let Some(token) = access_token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();
            Ok(ApiResponse { status, body })
        })
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, Option<TokenPair>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("/auth/refresh-token")?)
                .json(&RefreshBody { refresh_token })
                .send()
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let reply: RefreshReply = response.json().await?;
                    Ok(Some(TokenPair::new(reply.access_token, reply.refresh_token)))
                }
                StatusCode::UNAUTHORIZED => Ok(None),
                status => {
                    debug!("Unexpected refresh status: {status}");
                    Err(ClientError::Transport(format!(
                        "unexpected refresh status {status}"
                    )))
                }
            }
        })
    }

    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> TransportFuture<'a, Option<LoginSession>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("/auth/login")?)
                .json(&LoginBody { email, password })
                .send()
                .await?;
            match response.status() {
                StatusCode::OK => {
                    let reply: LoginReply = response.json().await?;
                    Ok(Some(LoginSession {
                        tokens: TokenPair::new(reply.access_token, reply.refresh_token),
                        roles: reply.roles,
                    }))
                }
                StatusCode::UNAUTHORIZED => Ok(None),
                status => Err(ClientError::Transport(format!(
                    "unexpected login status {status}"
                ))),
            }
        })
    }

    fn logout(&self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .post(self.url("/auth/logout")?)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_against_base() -> Result<(), ClientError> {
        let transport = HttpTransport::new("https://api.tokenward.dev/")?;
        assert_eq!(
            transport.url("/auth/me")?.as_str(),
            "https://api.tokenward.dev/auth/me"
        );
        assert!(HttpTransport::new("not a url").is_err());
        Ok(())
    }

    #[test]
    fn response_json_decode_errors() {
        let response = ApiResponse::new(StatusCode::OK, b"{\"a\":1}".to_vec());
        let value: Result<serde_json::Value, _> = response.json();
        assert!(value.is_ok());

        let broken = ApiResponse::new(StatusCode::OK, b"nope".to_vec());
        let decoded: Result<serde_json::Value, _> = broken.json();
        assert!(matches!(decoded, Err(ClientError::Decode(_))));
    }
}
