//! Client side of the token lifecycle.
//!
//! A [`RefreshCoordinator`] wraps a [`Transport`] and a shared [`ClientTokens`]. It attaches
//! the current access token to every request and, when the server answers `401`, lets
//! exactly one of the concurrent failures refresh the pair while the rest wait for that
//! outcome and replay.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokenward::client::{ApiRequest, ClientTokens, HttpTransport, RefreshCoordinator};
//!
//! # async fn run() -> Result<(), tokenward::client::ClientError> {
//! let transport = Arc::new(HttpTransport::new("https://api.tokenward.dev")?);
//! let coordinator = RefreshCoordinator::new(transport, ClientTokens::new());
//! coordinator.login("alice@example.com", "s3cret-pass").await?;
//! let me = coordinator.execute(&ApiRequest::get("/auth/me")).await?;
//! # let _ = me;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod error;
mod tokens;
mod transport;

pub use coordinator::{RefreshCoordinator, DEFAULT_REFRESH_TIMEOUT};
pub use error::{ClientError, RefreshFailure};
pub use tokens::{ClientTokens, TokenPair};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, LoginSession, Transport, TransportFuture,
};
