//! `comanda-common` defines common types and algorithms used by the comanda restaurant clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(feature = "unstable-doc-cfg", feature(doc_auto_cfg))]

pub mod event;
pub mod identity;
pub mod model;
pub mod role;

#[cfg(feature = "access_token")]
pub mod access_token;

/// Path of the authentication (login) page.
pub const LOGIN_PATH: &str = "/auth/login";

/// Fallback path for identities that hold no recognized role.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
