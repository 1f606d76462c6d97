//! Route guarding.

use comanda_common::{role::Role, LOGIN_PATH, UNAUTHORIZED_PATH};

use crate::session::Session;

/// The outcome of guarding a role-restricted view.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessDecision {
    /// The view may be shown.
    Granted,

    /// Nobody is logged in, or the access token has expired.
    LoginRequired,

    /// The user is logged in but holds none of the allowed roles.
    Forbidden,
}

impl AccessDecision {
    /// Where the caller should navigate instead of showing the view, if anywhere.
    pub fn redirect(self) -> Option<&'static str> {
        match self {
            Self::Granted => None,
            Self::LoginRequired => Some(LOGIN_PATH),
            Self::Forbidden => Some(UNAUTHORIZED_PATH),
        }
    }
}

impl Session {
    /// Decide whether a view restricted to `allowed_roles` may be shown.
    ///
    /// An empty `allowed_roles` only requires authentication. An expired access token is
    /// reported as [AccessDecision::LoginRequired] without attempting a refresh.
    pub fn authorize(&self, allowed_roles: &[Role]) -> AccessDecision {
        if !self.is_authenticated() {
            return AccessDecision::LoginRequired;
        }

        let permitted = allowed_roles.is_empty()
            || self.current_identity().is_some_and(|identity| {
                allowed_roles
                    .iter()
                    .any(|role| identity.has_role(role.group_name()))
            });

        if permitted {
            AccessDecision::Granted
        } else {
            tracing::debug!(?allowed_roles, "view forbidden for current identity");
            AccessDecision::Forbidden
        }
    }
}
