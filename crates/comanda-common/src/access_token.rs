//! Types defining the comanda access token.

use serde::{Deserialize, Serialize};

/// Claims for the comanda access token JWT.
///
/// Only the subject is trusted from these claims. Roles and permissions come
/// from the "who am I" endpoint.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// The id of the user the token was issued for, `0` when the claim is absent.
    #[serde(default)]
    pub user_id: i64,

    /// The username at the time the token was issued.
    #[serde(default)]
    pub username: String,

    /// Expiration time, in seconds since the unix epoch.
    pub exp: i64,
}

impl AccessTokenClaims {
    /// Whether the token has expired at the given unix time.
    ///
    /// A token whose expiry equals `now` is already expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
