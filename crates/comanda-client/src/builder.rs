use std::{borrow::Cow, path::PathBuf, sync::Arc, time::Duration};

use reqwest::Url;

use crate::{
    api::ApiUrls,
    error,
    gateway::Gateway,
    session::{Session, SessionEndpoints},
    storage::{FileStorage, MemoryStorage, SessionStorage},
    Client, ClientState, Error, API_PREFIX_ENV, API_URL_ENV, DEFAULT_API_PREFIX, DEFAULT_API_URL,
    SESSION_FILE_ENV,
};

/// A builder for configuring a [Client].
pub struct ClientBuilder {
    url: Cow<'static, str>,
    api_prefix: Cow<'static, str>,
    storage: Option<Arc<dyn SessionStorage>>,
    timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            url: Cow::Borrowed(DEFAULT_API_URL),
            api_prefix: Cow::Borrowed(DEFAULT_API_PREFIX),
            storage: None,
            timeout: None,
            http: None,
        }
    }

    /// Configure the client from environment variables.
    ///
    /// Reads the backend URL from `COMANDA_API_URL` and the API prefix from
    /// `COMANDA_API_PREFIX`. When `COMANDA_SESSION_FILE` is set, the session is persisted
    /// to that file. Unset variables leave the current setting untouched.
    pub fn from_environment(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.url = url.into();
        }
        if let Ok(prefix) = std::env::var(API_PREFIX_ENV) {
            self.api_prefix = prefix.into();
        }
        if let Some(path) = std::env::var_os(SESSION_FILE_ENV) {
            self = self.with_file_storage(path);
        }
        self
    }

    /// Override the backend URL (default is http://127.0.0.1:8000/)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().into();
        self
    }

    /// Override the path prefix of the resource API (default is `core`)
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into().into();
        self
    }

    /// Persist the session in the given storage (default is in-memory)
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Persist the session in a JSON file
    pub fn with_file_storage(self, path: impl Into<PathBuf>) -> Self {
        self.with_storage(Arc::new(FileStorage::new(path)))
    }

    /// Set a timeout for every request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured HTTP client. A timeout set with [ClientBuilder::with_timeout] is
    /// ignored in that case.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, Error> {
        let base_url = parse_base_url(&self.url)?;
        let api_prefix = self.api_prefix.trim_matches('/');
        let api_base = if api_prefix.is_empty() {
            base_url.clone()
        } else {
            base_url
                .join(&format!("{api_prefix}/"))
                .map_err(|_| Error::Config("invalid API prefix"))?
        };

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::ClientBuilder::new();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(error::unclassified)?
            }
        };

        let api_urls = ApiUrls::new(api_base)?;
        let endpoints = SessionEndpoints {
            token: join(&base_url, "api/token/")?,
            token_refresh: join(&base_url, "api/token/refresh/")?,
            me: api_urls.path(&["users", "me"]),
        };

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::default()));
        let session = Arc::new(Session::new(http.clone(), endpoints, storage));

        tracing::debug!(%base_url, "comanda client configured");

        Ok(Client {
            state: Arc::new(ClientState {
                gateway: Gateway::new(http, session),
                api_urls,
            }),
        })
    }
}

/// Parse the backend URL, making sure it ends with a slash so that joins stay below it.
fn parse_base_url(url: &str) -> Result<Url, Error> {
    let url = if url.ends_with('/') {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("{url}/"))
    };

    Url::parse(&url).map_err(|_| Error::Config("invalid API URL"))
}

fn join(base_url: &Url, path: &str) -> Result<Url, Error> {
    base_url
        .join(path)
        .map_err(|_| Error::Config("invalid API URL"))
}
