//! Persisted client state.
//!
//! Each value lives in its own file under the state directory, the same way a
//! daemon keeps its pid and port files. Values are opaque strings stored
//! verbatim; an empty file reads as absent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

pub const SESSION_KEY: &str = "session_id";
pub const TOKEN_KEY: &str = "token";
pub const PROVIDER_KEY: &str = "provider";

/// One-file-per-key store of opaque strings.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => (!s.is_empty()).then_some(s),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, "failed to read state entry: {}", e);
                None
            }
        }
    }

    /// Write through a temp file so a crash never leaves a half-written value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Owner of the gateway-issued session id.
///
/// The in-memory copy is authoritative for the running process. Persistence
/// is best-effort: a failed write is logged and the session still works until
/// the process exits.
#[derive(Debug)]
pub struct SessionStore {
    store: StateStore,
    current: Option<String>,
}

impl SessionStore {
    pub fn load(store: StateStore) -> Self {
        let current = store.get(SESSION_KEY);
        if let Some(id) = &current {
            debug!(session = %id, "loaded persisted session");
        }
        Self { store, current }
    }

    pub fn get(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Replace the held session id. Ids are never edited, only replaced.
    pub fn set(&mut self, id: &str) {
        if self.current.as_deref() == Some(id) {
            return;
        }
        if let Err(e) = self.store.set(SESSION_KEY, id) {
            warn!(session = %id, "failed to persist session id: {}", e);
        }
        self.current = Some(id.to_string());
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!("failed to remove persisted session id: {}", e);
        }
        self.current = None;
    }

    pub fn state(&self) -> &StateStore {
        &self.store
    }
}
