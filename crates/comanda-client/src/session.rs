//! The session store: who is logged in, and with which tokens.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use comanda_common::{identity::Identity, role::redirect_target_for_roles};
use http::header::AUTHORIZATION;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    error,
    storage::{PersistedSession, SessionStorage},
    token::{self, AccessToken},
    Error,
};

/// Credentials exchanged for a token pair at login.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl LoginCredentials {
    /// Construct new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Endpoints owned by the session store.
#[derive(Clone, Debug)]
pub(crate) struct SessionEndpoints {
    pub token: Url,
    pub token_refresh: Url,
    pub me: Url,
}

/// The single source of truth for "who is logged in and with what token".
///
/// The only network calls the session makes are the login exchange, the refresh exchange
/// and the identity fetch that completes a login. None of its operations return errors:
/// failures are logged and represented as `false`, `None` or a no-op.
///
/// [Session::refresh] is not safe to call concurrently by itself; the request gateway
/// serializes refreshes.
pub struct Session {
    http: reqwest::Client,
    endpoints: SessionEndpoints,
    storage: Arc<dyn SessionStorage>,
    /// Serializes storage writes that replace or patch the session.
    write_lock: Mutex<()>,
}

impl Session {
    pub(crate) fn new(
        http: reqwest::Client,
        endpoints: SessionEndpoints,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            http,
            endpoints,
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Log in with the given credentials.
    ///
    /// On success the token pair and the identity are persisted together and `true` is
    /// returned. On any failure nothing is persisted.
    pub async fn login(&self, credentials: &LoginCredentials) -> bool {
        match self.try_login(credentials).await {
            Ok(identity) => {
                tracing::info!(user_id = identity.id, username = %identity.username, "logged in");
                true
            }
            Err(err) => {
                tracing::warn!(username = %credentials.username, %err, "login failed");
                false
            }
        }
    }

    async fn try_login(&self, credentials: &LoginCredentials) -> Result<Identity, Error> {
        let tokens: TokenPair = self
            .http
            .post(self.endpoints.token.clone())
            .json(credentials)
            .send()
            .await
            .map_err(error::network)?
            .error_for_status()
            .map_err(error::network)?
            .json()
            .await
            .map_err(error::reqwest)?;

        let identity = self.fetch_identity(&tokens.access).await?;
        let user_info = serde_json::to_string(&identity).map_err(error::codec)?;

        let _guard = self.lock_writes();
        self.storage.save(&PersistedSession {
            access_token: Some(tokens.access),
            refresh_token: Some(tokens.refresh),
            user_info: Some(user_info),
        })?;

        Ok(identity)
    }

    /// Fetch the full identity behind an access token from the "who am I" endpoint.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<Identity, Error> {
        self.http
            .get(self.endpoints.me.clone())
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(error::network)?
            .error_for_status()
            .map_err(error::network)?
            .json()
            .await
            .map_err(error::reqwest)
    }

    /// Clear all persisted credentials and identity. Never fails.
    pub fn logout(&self) {
        let _guard = self.lock_writes();
        self.clear();
    }

    /// Exchange the persisted refresh token for a new access token.
    ///
    /// Returns the new access token, which is also persisted. When no refresh token is
    /// stored, or the exchange fails, the session is cleared and `None` is returned.
    ///
    /// The outcome only applies to the session that started the exchange. If the user
    /// logged out or logged in again meanwhile, the result is discarded, storage is left
    /// untouched and `None` is returned.
    pub async fn refresh(&self) -> Option<String> {
        let Some(refresh_token) = self.load().refresh_token else {
            tracing::info!("no refresh token stored");
            self.logout();
            return None;
        };

        let exchanged = self.exchange_refresh_token(&refresh_token).await;

        let _guard = self.lock_writes();
        let mut persisted = self.load();
        if persisted.refresh_token.as_deref() != Some(refresh_token.as_str()) {
            tracing::info!("session replaced during token refresh, discarding the result");
            return None;
        }

        let access_token = match exchanged {
            Ok(access_token) => access_token,
            Err(err) => {
                tracing::warn!(%err, "token refresh failed");
                self.clear();
                return None;
            }
        };

        persisted.access_token = Some(access_token.clone());
        match self.storage.save(&persisted) {
            Ok(()) => Some(access_token),
            Err(err) => {
                tracing::error!(%err, "could not persist refreshed access token");
                self.clear();
                None
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, Error> {
        let response: RefreshResponse = self
            .http
            .post(self.endpoints.token_refresh.clone())
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(error::network)?
            .error_for_status()
            .map_err(error::network)?
            .json()
            .await
            .map_err(error::reqwest)?;

        Ok(response.access)
    }

    /// The persisted access token, read fresh from storage.
    pub fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    /// Whether a non-expired access token is persisted.
    ///
    /// This is a pure query: an expired token is reported as such and never refreshed here.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(token::now())
    }

    /// Like [Session::is_authenticated], at the given unix time.
    pub fn is_authenticated_at(&self, now: i64) -> bool {
        let Some(access_token) = self.access_token() else {
            return false;
        };

        match AccessToken::decode(access_token) {
            Ok(token) => !token.is_expired_at(now),
            Err(err) => {
                tracing::debug!(%err, "persisted access token does not decode");
                false
            }
        }
    }

    /// The current identity.
    ///
    /// Prefers the persisted identity. Without one, a minimal identity is synthesized from
    /// the access token's claims.
    pub fn current_identity(&self) -> Option<Identity> {
        let persisted = self.load();

        if let Some(user_info) = persisted.user_info {
            match serde_json::from_str(&user_info) {
                Ok(identity) => return Some(identity),
                Err(err) => tracing::error!(%err, "could not decode persisted identity"),
            }
        }

        match AccessToken::decode(persisted.access_token?) {
            Ok(token) => Some(Identity::from_claims(&token.claims)),
            Err(err) => {
                tracing::error!(%err, "could not decode access token claims");
                None
            }
        }
    }

    /// Whether the current identity belongs to the named role (group).
    pub fn has_role(&self, role: &str) -> bool {
        self.current_identity()
            .is_some_and(|identity| identity.has_role(role))
    }

    /// Whether the current identity has been granted the given permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.current_identity()
            .is_some_and(|identity| identity.has_permission(permission))
    }

    /// The path the user should be sent to after login, based on their highest priority role.
    pub fn redirect_target_for_roles(&self) -> &'static str {
        let roles = self
            .current_identity()
            .map(|identity| identity.roles)
            .unwrap_or_default();

        redirect_target_for_roles(roles.iter().map(String::as_str))
    }

    /// Callers must hold the write lock.
    fn clear(&self) {
        if let Err(err) = self.storage.save(&PersistedSession::default()) {
            tracing::error!(%err, "could not clear persisted session");
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) -> PersistedSession {
        self.storage.load().unwrap_or_else(|err| {
            tracing::error!(%err, "could not load persisted session");
            PersistedSession::default()
        })
    }
}
