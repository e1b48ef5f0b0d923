// ── Session gate ──
//
// Owns who is logged in. The session survives restarts through a small
// JSON key/value file; anything unreadable in that file restores as
// "logged out" instead of failing startup.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::CredentialPolicy;
use crate::error::CoreError;

/// Storage key of the persisted session record.
pub const SESSION_KEY: &str = "damwatch.session";

// ── Session ──────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    /// Logged in without privileges, or an unrecognised stored role.
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ── LocalStorage ─────────────────────────────────────────────────────

/// A flat JSON object on disk, read and rewritten whole.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value under `key`. Missing or unreadable files read as empty.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.load().remove(key)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let mut entries = self.load();
        entries.insert(key.to_owned(), value);
        self.store(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.load();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.store(&entries)
    }

    fn load(&self) -> Map<String, Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read local storage");
                return Map::new();
            }
        };
        match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "local storage is corrupt, ignoring");
                Map::new()
            }
        }
    }

    /// Write to a uniquely named sibling temp file, then rename it over
    /// the real one.
    fn store(&self, entries: &Map<String, Value>) -> Result<(), CoreError> {
        let storage_err = |e: &dyn std::fmt::Display| CoreError::Storage {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| storage_err(&e))?;
        let json = serde_json::to_string_pretty(entries).map_err(|e| storage_err(&e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| storage_err(&e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| storage_err(&e))?;
        tmp.persist(&self.path).map_err(|e| storage_err(&e.error))?;
        Ok(())
    }
}

// ── SessionGate ──────────────────────────────────────────────────────

/// Identity and role state, shared by the dispatcher and the log views.
#[derive(Debug)]
pub struct SessionGate {
    policy: CredentialPolicy,
    storage: LocalStorage,
    current: ArcSwapOption<Session>,
    /// Held across each disk write and the matching in-memory publish.
    writer: Mutex<()>,
}

impl SessionGate {
    /// Build a gate, restoring any session persisted in `storage`.
    pub fn restore(policy: CredentialPolicy, storage: LocalStorage) -> Self {
        let restored = storage.get(SESSION_KEY).and_then(|value| {
            match serde_json::from_value::<Session>(value) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "stored session is unreadable, starting logged out");
                    None
                }
            }
        });
        if let Some(session) = &restored {
            debug!(name = %session.name, role = %session.role, "restored session");
        }

        Self {
            policy,
            storage,
            current: ArcSwapOption::from(restored.map(Arc::new)),
            writer: Mutex::new(()),
        }
    }

    /// Check credentials and, on success, persist and publish the session.
    pub fn authenticate(&self, identity: &str, secret: &str) -> Result<Session, CoreError> {
        if !self.policy.verify(identity, secret) {
            warn!(identity, "login rejected");
            return Err(CoreError::InvalidCredentials);
        }

        let session = Session {
            name: identity.to_owned(),
            role: Role::Admin,
        };
        let record = serde_json::to_value(&session).map_err(|e| CoreError::Storage {
            path: self.storage.path().display().to_string(),
            reason: e.to_string(),
        })?;

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.set(SESSION_KEY, record)?;
        self.current.store(Some(Arc::new(session.clone())));

        info!(name = %session.name, "session started");
        Ok(session)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.current.load_full().map(|s| (*s).clone())
    }

    pub fn is_admin(&self) -> bool {
        self.current
            .load()
            .as_deref()
            .is_some_and(Session::is_admin)
    }

    /// Forget the session on disk, then in memory.
    pub fn end_session(&self) -> Result<(), CoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.remove(SESSION_KEY)?;
        if let Some(previous) = self.current.swap(None) {
            info!(name = %previous.name, "session ended");
        }
        Ok(())
    }
}
