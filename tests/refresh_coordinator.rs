//! End-to-end refresh coordination against the real router.
//!
//! The coordinator talks to the axum application in-process (no socket) through a
//! [`Transport`] that drives the router with `oneshot`. The server side uses the in-memory
//! store, so rotation is the real single-use check-and-set.
//!
//! Flow covered:
//! 1. Log in through the coordinator.
//! 2. Swap in an access token that expired ten minutes ago.
//! 3. Fire concurrent protected requests and check how many refresh calls reach the server.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request,
    },
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use http_body_util::BodyExt;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokenward::{
    api::{app, AuthState},
    auth::{hash_password, AuthConfig, MemoryCredentialStore, TokenIssuer, UserCredential},
    client::{
        ApiRequest, ApiResponse, ClientError, ClientTokens, LoginSession, RefreshCoordinator,
        RefreshFailure, TokenPair, Transport, TransportFuture,
    },
};
use tower::ServiceExt;

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "correct horse battery staple";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairReply {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeReply {
    email: String,
}

struct Server {
    router: Router,
    issuer: TokenIssuer,
    user: UserCredential,
}

impl Server {
    async fn start() -> Result<Self> {
        let user = UserCredential::new(EMAIL, hash_password(PASSWORD)?, vec!["admin".to_string()]);
        let store = MemoryCredentialStore::new();
        store.insert(user.clone()).await?;

        let config = AuthConfig::new(
            "https://auth.tokenward.dev".to_string(),
            "tokenward".to_string(),
            SecretString::from("integration-signing-key-0123456789".to_string()),
        )?;
        let issuer = TokenIssuer::new(&config);
        let state = Arc::new(AuthState::new(config, Arc::new(store)));
        Ok(Self {
            router: app(state)?,
            issuer,
            user,
        })
    }

    /// An access token for the test user that expired ten minutes ago.
    fn expired_access_token(&self) -> Result<String> {
        let issued_at = Utc::now() - ChronoDuration::minutes(15);
        Ok(self.issuer.issue_access_token(&self.user, issued_at)?.token)
    }

    fn transport(&self, refresh_calls: &Arc<AtomicUsize>) -> RouterTransport {
        RouterTransport {
            router: self.router.clone(),
            refresh_calls: refresh_calls.clone(),
            wait_for_rotation_in: None,
        }
    }
}

struct RouterTransport {
    router: Router,
    refresh_calls: Arc<AtomicUsize>,
    /// When set, refresh calls wait until this storage no longer holds the presented
    /// token, so another tab is guaranteed to rotate first.
    wait_for_rotation_in: Option<ClientTokens>,
}

fn build_request(
    method: Method,
    path: &str,
    access_token: Option<&str>,
    body: Option<&Value>,
) -> Result<Request<Body>, ClientError> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = access_token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder
        .body(body)
        .map_err(|err| ClientError::Transport(err.to_string()))
}

impl RouterTransport {
    async fn call(&self, request: Request<Body>) -> Result<ApiResponse, ClientError> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|err| match err {});
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?
            .to_bytes();
        Ok(ApiResponse::new(status, body.to_vec()))
    }

    async fn wait_for_rotation(&self, presented: &str) -> Result<(), ClientError> {
        let Some(tokens) = &self.wait_for_rotation_in else {
            return Ok(());
        };
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokens.refresh_token()?.as_deref() == Some(presented)
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(())
    }
}

impl Transport for RouterTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        access_token: Option<&'a str>,
    ) -> TransportFuture<'a, ApiResponse> {
        Box::pin(async move {
            let http = build_request(
                request.method.clone(),
                &request.path,
                access_token,
                request.body.as_ref(),
            )?;
            self.call(http).await
        })
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, Option<TokenPair>> {
        Box::pin(async move {
            self.wait_for_rotation(refresh_token).await?;
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);

            let body = json!({ "refreshToken": refresh_token });
            let response = self
                .call(build_request(
                    Method::POST,
                    "/auth/refresh-token",
                    None,
                    Some(&body),
                )?)
                .await?;
            match response.status {
                StatusCode::OK => {
                    let reply: PairReply = response.json()?;
                    Ok(Some(TokenPair::new(reply.access_token, reply.refresh_token)))
                }
                StatusCode::UNAUTHORIZED => Ok(None),
                status => Err(ClientError::Transport(format!(
                    "unexpected refresh status {status}"
                ))),
            }
        })
    }

    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> TransportFuture<'a, Option<LoginSession>> {
        Box::pin(async move {
            let body = json!({ "email": email, "password": password });
            let response = self
                .call(build_request(Method::POST, "/auth/login", None, Some(&body))?)
                .await?;
            if response.is_unauthorized() {
                return Ok(None);
            }
            let reply: PairReply = response.json()?;
            Ok(Some(LoginSession {
                tokens: TokenPair::new(reply.access_token, reply.refresh_token),
                roles: reply.roles,
            }))
        })
    }

    fn logout(&self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let response = self
                .call(build_request(Method::POST, "/auth/logout", None, None)?)
                .await?;
            if response.status != StatusCode::NO_CONTENT {
                return Err(ClientError::Transport(format!(
                    "unexpected logout status {}",
                    response.status
                )));
            }
            Ok(())
        })
    }
}

/// Log in, then swap the fresh access token for an expired one.
async fn expired_session(server: &Server, coordinator: &RefreshCoordinator) -> Result<String> {
    let session = coordinator.login(EMAIL, PASSWORD).await?;
    assert_eq!(session.roles, vec!["admin"]);
    let refresh_token = session.tokens.refresh_token;
    coordinator
        .tokens()
        .set(TokenPair::new(server.expired_access_token()?, refresh_token.clone()))?;
    Ok(refresh_token)
}

fn fire(
    coordinator: &RefreshCoordinator,
    count: usize,
) -> Vec<tokio::task::JoinHandle<Result<ApiResponse, ClientError>>> {
    (0..count)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.execute(&ApiRequest::get("/auth/me")).await })
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expired_requests_refresh_once() -> Result<()> {
    let server = Server::start().await?;
    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let coordinator =
        RefreshCoordinator::new(Arc::new(server.transport(&refresh_calls)), ClientTokens::new());
    let original_refresh = expired_session(&server, &coordinator).await?;

    for handle in fire(&coordinator, 6) {
        let response = handle.await??;
        assert_eq!(response.status, StatusCode::OK);
        let me: MeReply = response.json()?;
        assert_eq!(me.email, EMAIL);
    }

    assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    let current = coordinator
        .tokens()
        .refresh_token()?
        .context("refresh token kept")?;
    assert_ne!(current, original_refresh);
    assert!(!coordinator.is_refreshing()?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tabs_sharing_storage_adopt_each_others_rotation() -> Result<()> {
    let server = Server::start().await?;
    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let shared = ClientTokens::new();

    let tab_a = RefreshCoordinator::new(Arc::new(server.transport(&refresh_calls)), shared.clone());
    let mut lagging = server.transport(&refresh_calls);
    lagging.wait_for_rotation_in = Some(shared.clone());
    let tab_b = RefreshCoordinator::new(Arc::new(lagging), shared.clone());

    expired_session(&server, &tab_a).await?;

    let mut handles = fire(&tab_a, 3);
    handles.extend(fire(&tab_b, 3));
    for handle in handles {
        let response = handle.await??;
        assert_eq!(response.status, StatusCode::OK);
    }

    let calls = refresh_calls.load(Ordering::SeqCst);
    assert!((1..=2).contains(&calls), "refresh calls: {calls}");
    assert!(!shared.is_expired()?);
    assert!(shared.get()?.is_some());
    Ok(())
}

#[tokio::test]
async fn refresh_token_used_elsewhere_ends_session() -> Result<()> {
    let server = Server::start().await?;
    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let transport = Arc::new(server.transport(&refresh_calls));
    let coordinator = RefreshCoordinator::new(transport.clone(), ClientTokens::new());
    let refresh_token = expired_session(&server, &coordinator).await?;

    // Someone else redeems the same refresh token first.
    assert!(transport.refresh(&refresh_token).await?.is_some());

    let result = coordinator.execute(&ApiRequest::get("/auth/me")).await;
    assert!(matches!(
        result,
        Err(ClientError::Refresh(RefreshFailure::Rejected))
    ));
    assert!(coordinator.tokens().is_expired()?);

    let again = coordinator.execute(&ApiRequest::get("/auth/me")).await;
    assert!(matches!(again, Err(ClientError::SessionExpired)));
    assert_eq!(refresh_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_logout() -> Result<()> {
    let server = Server::start().await?;
    let refresh_calls = Arc::new(AtomicUsize::new(0));
    let coordinator =
        RefreshCoordinator::new(Arc::new(server.transport(&refresh_calls)), ClientTokens::new());

    let denied = coordinator.login(EMAIL, "wrong password").await;
    assert!(matches!(denied, Err(ClientError::InvalidCredentials)));

    coordinator.login(EMAIL, PASSWORD).await?;
    let me = coordinator.execute(&ApiRequest::get("/auth/me")).await?;
    assert_eq!(me.status, StatusCode::OK);

    coordinator.logout().await?;
    assert!(coordinator.tokens().get()?.is_none());

    let after = coordinator.execute(&ApiRequest::get("/auth/me")).await;
    assert!(matches!(
        after,
        Err(ClientError::Refresh(RefreshFailure::MissingRefreshToken))
    ));
    assert_eq!(refresh_calls.load(Ordering::SeqCst), 0);
    Ok(())
}
