use http::StatusCode;

/// Errors that can happen either during client configuration or while communicating over the network.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The request was still rejected as unauthorized after refreshing the access token once.
    #[error("unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    /// The session could not be renewed: the refresh token was missing or rejected.
    ///
    /// The session has been cleared and the user must authenticate again.
    #[error("session expired")]
    SessionExpired,

    /// A network problem.
    #[error("network error: {0}")]
    Network(anyhow::Error),

    /// The backend answered with an error status other than 401.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// The response status.
        status: StatusCode,
        /// The response body, as text.
        body: String,
    },

    /// A codec problem, usually a response body that could not be decoded.
    #[error("encoding error: {0}")]
    Codec(anyhow::Error),

    /// An access token problem.
    #[error("invalid access token: {0}")]
    InvalidAccessToken(anyhow::Error),

    /// The session storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    /// A problem with the client configuration.
    #[error("configuration error: {0}")]
    Config(&'static str),

    /// Other type of unclassified error.
    #[error("unclassified error: {0}")]
    Unclassified(anyhow::Error),
}

pub(crate) fn unclassified(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Unclassified(anyhow::Error::from(err))
}

pub(crate) fn network(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Network(anyhow::Error::from(err))
}

pub(crate) fn codec(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Codec(anyhow::Error::from(err))
}

pub(crate) fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Storage(anyhow::Error::from(err))
}

/// Classify a failed reqwest call.
///
/// Body decoding failures are codec errors, everything else is a network error.
pub(crate) fn reqwest(err: reqwest::Error) -> Error {
    if err.is_decode() {
        codec(err)
    } else {
        network(err)
    }
}
