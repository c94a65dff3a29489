//! Single-flight access token refresh for one client session.
//!
//! Every request goes through [`RefreshCoordinator::execute`]. A `401` on a request that
//! has not been retried puts it into one of three roles, decided under one lock with no
//! suspension between checking and setting `refreshing`:
//!
//! - **leader**: nobody is refreshing; it performs the refresh (the only await) and then
//!   settles every waiter with the same outcome, oldest first;
//! - **waiter**: a refresh is in flight; it queues a completion and waits;
//! - **replay**: a refresh already finished after this request was sent, so the stored
//!   access token is newer than the one it carried.
//!
//! On success the request is replayed once with the current token. A `401` on that replay
//! is returned to the caller unchanged and never starts another refresh.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{sync::oneshot, time::timeout};
use tracing::{debug, info, warn};

use super::{
    error::{ClientError, RefreshFailure},
    tokens::ClientTokens,
    transport::{ApiRequest, ApiResponse, LoginSession, Transport},
};

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

type Outcome = Result<(), RefreshFailure>;

#[derive(Default)]
struct FlightState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<Outcome>>,
}

impl FlightState {
    /// Leave the refreshing state and hand `outcome` to every waiter, oldest first.
    fn settle(&mut self, outcome: &Outcome) -> usize {
        self.refreshing = false;
        let waiters = std::mem::take(&mut self.waiters);
        let count = waiters.len();
        for waiter in waiters {
            // The receiver is gone if that caller stopped waiting.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

enum Role {
    Leader { refresh_token: String },
    Waiter(oneshot::Receiver<Outcome>),
    Replay,
}

/// Settles the flight with [`RefreshFailure::Abandoned`] if the leader is dropped
/// mid-refresh.
struct LeaderGuard {
    state: Arc<Mutex<FlightState>>,
    armed: bool,
}

impl LeaderGuard {
    fn settle(mut self, outcome: &Outcome) -> usize {
        self.armed = false;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.settle(outcome)
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let abandoned = state.settle(&Err(RefreshFailure::Abandoned));
            warn!(abandoned, "Refresh leader dropped before completing");
        }
    }
}

/// One instance per client session; `Clone` shares the same flight state.
///
/// Coordinators built over the same [`ClientTokens`] (several tabs of one browser, say)
/// keep independent flights but see each other's rotations.
#[derive(Clone)]
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    tokens: ClientTokens,
    state: Arc<Mutex<FlightState>>,
    refresh_timeout: Duration,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, tokens: ClientTokens) -> Self {
        Self {
            transport,
            tokens,
            state: Arc::new(Mutex::new(FlightState::default())),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    #[must_use]
    pub fn tokens(&self) -> &ClientTokens {
        &self.tokens
    }

    /// # Errors
    /// Returns [`ClientError::Lock`] if the state lock is poisoned.
    pub fn is_refreshing(&self) -> Result<bool, ClientError> {
        Ok(self.state.lock().map_err(|_| ClientError::Lock)?.refreshing)
    }

    /// Requests currently queued behind an in-flight refresh.
    ///
    /// # Errors
    /// Returns [`ClientError::Lock`] if the state lock is poisoned.
    pub fn pending_waiters(&self) -> Result<usize, ClientError> {
        Ok(self.state.lock().map_err(|_| ClientError::Lock)?.waiters.len())
    }

    /// Log in and store the issued pair.
    ///
    /// # Errors
    /// [`ClientError::InvalidCredentials`] when the server rejects the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, ClientError> {
        let Some(session) = self.transport.login(email, password).await? else {
            return Err(ClientError::InvalidCredentials);
        };
        self.tokens.set(session.tokens.clone())?;
        Ok(session)
    }

    /// Drop the local pair, then tell the server to clear its cookies.
    ///
    /// # Errors
    /// Propagates the transport error; local tokens are cleared regardless.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.tokens.clear()?;
        self.transport.logout().await
    }

    /// Send `request` with the current access token, refreshing once on `401`.
    ///
    /// # Errors
    /// Transport failures, [`ClientError::Refresh`] when the refresh this request
    /// depended on failed, [`ClientError::SessionExpired`] once a refresh has failed
    /// terminally.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let sent_with = self.tokens.access_token()?;
        let response = self.transport.send(request, sent_with.as_deref()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        self.recover(sent_with.as_deref()).await?;

        let current = self.tokens.access_token()?;
        let replay = self.transport.send(request, current.as_deref()).await?;
        if replay.is_unauthorized() {
            debug!(path = %request.path, "Replay still unauthorized");
        }
        Ok(replay)
    }

    async fn recover(&self, sent_with: Option<&str>) -> Result<(), ClientError> {
        match self.join_flight(sent_with)? {
            Role::Replay => Ok(()),
            Role::Waiter(completion) => match completion.await {
                Ok(outcome) => outcome.map_err(ClientError::from),
                Err(_) => Err(RefreshFailure::Abandoned.into()),
            },
            Role::Leader { refresh_token } => self.lead(refresh_token).await,
        }
    }

    fn join_flight(&self, sent_with: Option<&str>) -> Result<Role, ClientError> {
        let mut state = self.state.lock().map_err(|_| ClientError::Lock)?;
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            return Ok(Role::Waiter(rx));
        }

        let Some(current) = self.tokens.get()? else {
            return Err(if self.tokens.is_expired()? {
                ClientError::SessionExpired
            } else {
                RefreshFailure::MissingRefreshToken.into()
            });
        };

        if sent_with != Some(current.access_token.as_str()) {
            return Ok(Role::Replay);
        }

        state.refreshing = true;
        Ok(Role::Leader {
            refresh_token: current.refresh_token,
        })
    }

    async fn lead(&self, presented: String) -> Result<(), ClientError> {
        let guard = LeaderGuard {
            state: self.state.clone(),
            armed: true,
        };

        let outcome = self.refresh_once(&presented).await;
        let waiters = guard.settle(&outcome);

        match &outcome {
            Ok(()) => info!(waiters, "Access token refreshed"),
            Err(failure) => warn!(waiters, %failure, "Refresh failed"),
        }
        outcome.map_err(ClientError::from)
    }

    async fn refresh_once(&self, presented: &str) -> Outcome {
        let reply = match timeout(self.refresh_timeout, self.transport.refresh(presented)).await {
            Ok(reply) => reply,
            Err(_) => return self.fail(presented, RefreshFailure::TimedOut),
        };

        match reply {
            Ok(Some(pair)) => self
                .tokens
                .set(pair)
                .map_err(|err| RefreshFailure::Transport(err.to_string())),
            Ok(None) => match self.tokens.refresh_token() {
                // Another coordinator sharing the storage rotated first.
                Ok(Some(current)) if current != presented => {
                    debug!("Adopting token pair rotated by another client");
                    Ok(())
                }
                _ => self.fail(presented, RefreshFailure::Rejected),
            },
            Err(err) => self.fail(presented, RefreshFailure::Transport(err.to_string())),
        }
    }

    /// Terminal failure: drop the pair we tried to refresh.
    fn fail(&self, presented: &str, failure: RefreshFailure) -> Outcome {
        if let Err(err) = self.tokens.expire_if_current(presented) {
            warn!("Failed to clear tokens after refresh failure: {err}");
        }
        Err(failure)
    }
}
