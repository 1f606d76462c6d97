//! Staff roles and role-based redirection.

use std::{fmt::Display, str::FromStr};

use crate::UNAUTHORIZED_PATH;

/// A staff role known to the restaurant frontend.
///
/// Roles are backend groups, identified by their (Spanish) group name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Role {
    /// Full administrative access.
    Administrator,
    /// Restaurant manager, has access to the analytics dashboard.
    Manager,
    /// Waiting staff, takes orders.
    Waiter,
    /// Kitchen staff, advances order lines through their states.
    Cook,
}

impl Role {
    /// All known roles in redirect priority order, highest first.
    pub const PRIORITY: [Role; 4] = [Role::Administrator, Role::Manager, Role::Waiter, Role::Cook];

    /// The backend group name of this role.
    pub const fn group_name(self) -> &'static str {
        match self {
            Self::Administrator => "Administrador",
            Self::Manager => "Gerente",
            Self::Waiter => "Mesero",
            Self::Cook => "Cocinero",
        }
    }

    /// The dashboard a user holding this role lands on after login.
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::Administrator => "/admin/dashboard",
            Self::Manager => "/gerente/dashboard",
            Self::Waiter => "/mesero/dashboard",
            Self::Cook => "/cocinero/dashboard",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.group_name())
    }
}

/// The group name did not match any known [Role].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRIORITY
            .into_iter()
            .find(|role| role.group_name() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Compute the landing path for a set of role (group) names.
///
/// The first role in [Role::PRIORITY] held by the user wins; roles are never combined.
/// Returns [UNAUTHORIZED_PATH] when no known role is held.
pub fn redirect_target_for_roles<'a>(roles: impl IntoIterator<Item = &'a str>) -> &'static str {
    let held: Vec<Role> = roles.into_iter().filter_map(|r| r.parse().ok()).collect();

    Role::PRIORITY
        .into_iter()
        .find(|role| held.contains(role))
        .map(Role::landing_path)
        .unwrap_or(UNAUTHORIZED_PATH)
}
