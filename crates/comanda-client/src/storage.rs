//! Durable session persistence.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::{error, Error};

/// The persisted session state: three independent keys, each of which may be absent.
///
/// Absence of any key is a valid "logged out" state.
#[derive(Clone, Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PersistedSession {
    /// The current access token.
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The refresh token.
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The serialized identity, as returned by the "who am I" endpoint.
    #[serde(rename = "userInfo", default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<String>,
}

impl PersistedSession {
    /// Whether no key is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user_info.is_none()
    }
}

/// Key-value storage for the session that survives restarts.
///
/// Every `save` replaces the whole session, so credentials and identity are written
/// together and cleared together.
pub trait SessionStorage: Send + Sync {
    /// Load the persisted session. A storage that was never written yields an empty session.
    fn load(&self) -> Result<PersistedSession, Error>;

    /// Replace the persisted session.
    fn save(&self, session: &PersistedSession) -> Result<(), Error>;
}

/// Non-durable storage, mostly useful for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryStorage {
    session: ArcSwap<PersistedSession>,
}

impl MemoryStorage {
    /// Create storage pre-populated with a session.
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: ArcSwap::from_pointee(session),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<PersistedSession, Error> {
        Ok(self.session.load().as_ref().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), Error> {
        self.session.store(Arc::new(session.clone()));
        Ok(())
    }
}

/// Storage backed by a JSON document on disk.
///
/// Writes go to a temporary sibling file which is then renamed over the target, so a
/// crash never leaves a half-written session behind.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Use the file at `path`. The file is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut file_name = self.path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<PersistedSession, Error> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(error::codec),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(PersistedSession::default())
            }
            Err(err) => Err(error::storage(err)),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), Error> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage(anyhow::anyhow!("storage lock poisoned")))?;

        if session.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(error::storage(err)),
            };
        }

        let json = serde_json::to_vec_pretty(session).map_err(error::codec)?;
        let tmp_path = self.tmp_path();

        let mut file = std::fs::File::create(&tmp_path).map_err(error::storage)?;
        file.write_all(&json).map_err(error::storage)?;
        file.sync_all().map_err(error::storage)?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(error::storage)
    }
}
