//! The authenticated request gateway.
//!
//! Every API call goes through [Gateway::execute], which attaches the current access token
//! and recovers from one authorization failure per call by refreshing the token. Concurrent
//! failures share a single refresh exchange, see [RefreshFlight].

use std::sync::{Arc, Mutex, MutexGuard};

use http::{header::AUTHORIZATION, Method, StatusCode};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::{error, session::Session, Error};

/// A replayable API request.
#[derive(Clone, Debug)]
pub(crate) struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub(crate) struct Gateway {
    http: reqwest::Client,
    session: Arc<Session>,
    flight: RefreshFlight,
}

impl Gateway {
    pub fn new(http: reqwest::Client, session: Arc<Session>) -> Self {
        Self {
            http,
            session,
            flight: RefreshFlight::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Execute a request and decode the JSON response body.
    pub async fn json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, Error> {
        self.execute(request)
            .await?
            .json()
            .await
            .map_err(error::reqwest)
    }

    /// Execute a request with the current access token.
    ///
    /// A 401 response triggers one token refresh followed by one replay of the request.
    /// A second 401 is final. Any other error status fails immediately.
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, Error> {
        let access_token = self.session.access_token();
        let response = self.dispatch(request, access_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        tracing::debug!(method = %request.method, url = %request.url, "unauthorized, renewing access token");

        let renewed = self.renew_access_token(access_token.as_deref()).await?;
        let response = self.dispatch(request, Some(&renewed)).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(method = %request.method, url = %request.url, "still unauthorized after token refresh");
            return Err(Error::Unauthorized(anyhow::anyhow!(
                "{} {} was rejected with a refreshed access token",
                request.method,
                request.url
            )));
        }

        check_status(response).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone());

        if let Some(access_token) = access_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {access_token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(error::network)
    }

    /// Obtain an access token to replay a request that was rejected with `stale_token`.
    async fn renew_access_token(&self, stale_token: Option<&str>) -> Result<String, Error> {
        // Another call may already have renewed the token after this one was sent.
        if let Some(current) = self.session.access_token() {
            if stale_token != Some(current.as_str()) {
                return Ok(current);
            }
        }

        match self.flight.join() {
            Ticket::Leader(guard) => {
                let renewed = self.session.refresh().await;
                let waiters = guard.settle(renewed.clone());
                tracing::debug!(waiters, success = renewed.is_some(), "token refresh settled");

                renewed.ok_or(Error::SessionExpired)
            }
            Ticket::Waiter(receiver) => {
                tracing::debug!("token refresh in flight, waiting");
                receiver.await.ok().flatten().ok_or(Error::SessionExpired)
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status { status, body });
    }

    Ok(response)
}

/// Single-flight coordination of the refresh exchange.
///
/// The first caller to [RefreshFlight::join] becomes the leader and performs the refresh.
/// Callers joining while it is in flight are queued in arrival order and receive the
/// outcome when the leader settles. Checking and setting the in-flight flag happens under
/// one lock, so there is never more than one refresh in flight.
#[derive(Default)]
pub(crate) struct RefreshFlight {
    state: Mutex<FlightState>,
}

#[derive(Default)]
struct FlightState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Option<String>>>,
}

pub(crate) enum Ticket<'f> {
    Leader(FlightGuard<'f>),
    Waiter(oneshot::Receiver<Option<String>>),
}

impl RefreshFlight {
    pub fn join(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            Ticket::Waiter(receiver)
        } else {
            state.in_flight = true;
            Ticket::Leader(FlightGuard {
                flight: self,
                settled: false,
            })
        }
    }

    #[cfg(test)]
    fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Clear the flag and drain the queue atomically, then notify waiters in order.
    fn settle(&self, outcome: Option<String>) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        // The state is consistent between statements, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held by the leader of a refresh. Dropping it unsettled fails all waiters.
pub(crate) struct FlightGuard<'f> {
    flight: &'f RefreshFlight,
    settled: bool,
}

impl FlightGuard<'_> {
    /// Publish the refresh outcome to every queued waiter. Returns the number of waiters.
    pub fn settle(mut self, outcome: Option<String>) -> usize {
        self.settled = true;
        self.flight.settle(outcome)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("token refresh abandoned");
            self.flight.settle(None);
        }
    }
}
