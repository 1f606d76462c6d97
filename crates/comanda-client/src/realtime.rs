//! Support for the real-time push channel.
//!
//! The channel itself is driven by the caller. The client only provides the connect-time
//! authentication payload and tells which data a push event invalidates.

use comanda_common::event::RefetchScope;
use serde::Serialize;

use crate::session::Session;

/// Authentication payload sent when connecting to the push channel.
///
/// The token is sent without the `Bearer` prefix. The channel is not re-authenticated
/// when the access token is refreshed; reconnect with a fresh payload to renew it.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct ConnectAuth {
    /// The current access token.
    pub token: String,
}

impl std::fmt::Debug for ConnectAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectAuth").finish_non_exhaustive()
    }
}

impl Session {
    /// The payload to authenticate the push channel with, or `None` when logged out.
    pub fn connect_auth(&self) -> Option<ConnectAuth> {
        self.access_token().map(|token| ConnectAuth { token })
    }
}

/// Decide whether a push event requires refetching REST data, and which.
pub fn refetch_scope(event_name: &str) -> Option<RefetchScope> {
    let scope = RefetchScope::from_event(event_name);
    if scope.is_none() {
        tracing::trace!(event_name, "ignoring push event");
    }
    scope
}
