//! The resolved user identity.

use serde::{Deserialize, Serialize};

#[cfg(feature = "access_token")]
use crate::access_token::AccessTokenClaims;

use crate::role::Role;

/// A resolved user profile, including role and permission sets.
///
/// Roles and permissions keep the order the backend sent them in, but are only
/// ever queried for membership.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Numeric user id.
    pub id: i64,

    /// Login name.
    pub username: String,

    /// E-mail address, possibly empty.
    #[serde(default)]
    pub email: String,

    /// Given name, possibly empty.
    #[serde(default)]
    pub first_name: String,

    /// Family name, possibly empty.
    #[serde(default)]
    pub last_name: String,

    /// Names of the groups (roles) the user belongs to.
    #[serde(rename = "grupos", default)]
    pub roles: Vec<String>,

    /// Permission codenames granted to the user.
    #[serde(rename = "permisos", default)]
    pub permissions: Vec<String>,
}

impl Identity {
    /// Synthesize a minimal identity from access token claims.
    ///
    /// The result carries the subject only, with empty role and permission sets.
    #[cfg(feature = "access_token")]
    pub fn from_claims(claims: &AccessTokenClaims) -> Self {
        Self {
            id: claims.user_id,
            username: claims.username.clone(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            roles: vec![],
            permissions: vec![],
        }
    }

    /// Whether the identity belongs to the named role (group).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether the identity has been granted the given permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// The known roles held by this identity, skipping unrecognized group names.
    pub fn known_roles(&self) -> impl Iterator<Item = Role> + use<'_> {
        self.roles.iter().filter_map(|name| name.parse().ok())
    }

    /// The landing path for this identity, see [crate::role::redirect_target_for_roles].
    pub fn redirect_target(&self) -> &'static str {
        crate::role::redirect_target_for_roles(self.roles.iter().map(String::as_str))
    }
}
