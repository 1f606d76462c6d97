//! `comanda-client` is an asynchronous Rust client for the comanda restaurant backend.
//!
//! It owns the user session (login, logout, token refresh, identity and role queries) and
//! routes every API call through an authenticated gateway. The gateway attaches the
//! current access token and, when the backend answers 401, refreshes the token once and
//! replays the call. Concurrent 401s share a single refresh exchange.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use api::{
    names, ApiUrls, Components, Customers, DashboardApi, Groups, MenuItems, OrderLines,
    OrderStates, Orders, Resource, Tables, Users,
};
use comanda_common::identity::Identity;
use gateway::{ApiRequest, Gateway};
use http::Method;

pub use builder::ClientBuilder;
pub use comanda_common::{event::RefetchScope, model, role::Role};
pub use error::Error;
pub use session::{LoginCredentials, Session};

/// Access control.
pub mod access_control;

/// Resource APIs.
pub mod api;

/// Real-time channel support.
pub mod realtime;

/// Session storage.
pub mod storage;

/// Token utilities.
pub mod token;

mod builder;
mod error;
mod gateway;
mod session;

/// Environment variable holding the backend URL.
const API_URL_ENV: &str = "COMANDA_API_URL";

/// Environment variable holding the resource API prefix.
const API_PREFIX_ENV: &str = "COMANDA_API_PREFIX";

/// Environment variable holding the path of the session file.
const SESSION_FILE_ENV: &str = "COMANDA_SESSION_FILE";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/";
const DEFAULT_API_PREFIX: &str = "core";

/// The comanda client handle.
#[derive(Clone)]
pub struct Client {
    state: Arc<ClientState>,
}

struct ClientState {
    gateway: Gateway,
    api_urls: ApiUrls,
}

impl Client {
    /// Construct a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The session store of this client.
    pub fn session(&self) -> &Session {
        self.state.gateway.session()
    }

    /// Log in, see [Session::login].
    pub async fn login(&self, credentials: &LoginCredentials) -> bool {
        self.session().login(credentials).await
    }

    /// Log out, see [Session::logout].
    pub fn logout(&self) {
        self.session().logout()
    }

    /// Fetch the identity of the logged in user through the authenticated gateway.
    pub async fn me(&self) -> Result<Identity, Error> {
        self.state
            .gateway
            .json(&ApiRequest::new(
                Method::GET,
                self.state.api_urls.path(&["users", "me"]),
            ))
            .await
    }

    /// Menu components.
    pub fn components(&self) -> Components<'_> {
        self.resource(names::COMPONENTS)
    }

    /// Menu items.
    pub fn menu_items(&self) -> MenuItems<'_> {
        self.resource(names::MENU_ITEMS)
    }

    /// Order line states.
    pub fn order_states(&self) -> OrderStates<'_> {
        self.resource(names::ORDER_STATES)
    }

    /// Dining room tables.
    pub fn tables(&self) -> Tables<'_> {
        self.resource(names::TABLES)
    }

    /// Registered customers.
    pub fn customers(&self) -> Customers<'_> {
        self.resource(names::CUSTOMERS)
    }

    /// Orders.
    pub fn orders(&self) -> Orders<'_> {
        self.resource(names::ORDERS)
    }

    /// Order lines.
    pub fn order_lines(&self) -> OrderLines<'_> {
        self.resource(names::ORDER_LINES)
    }

    /// User accounts.
    pub fn users(&self) -> Users<'_> {
        self.resource(names::USERS)
    }

    /// Permission groups.
    pub fn groups(&self) -> Groups<'_> {
        self.resource(names::GROUPS)
    }

    /// The manager dashboard.
    pub fn dashboard(&self) -> DashboardApi<'_> {
        DashboardApi::new(&self.state.gateway, &self.state.api_urls)
    }

    fn resource<T: serde::de::DeserializeOwned>(&self, name: &'static str) -> Resource<'_, T> {
        Resource::new(&self.state.gateway, &self.state.api_urls, name)
    }
}
