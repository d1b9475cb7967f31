//! Persistent storage for sessions
//!
//! Layout under the storage root:
//!
//! <root>/
//! ├── sessions/                 # One JSON file per session
//! │   ├── session_<uuid>.json
//! │   └── current               # Pointer to the current session id
//!
//! The engine treats this as a port: writes are optimistic and the
//! in-memory state never rolls back on a storage failure (see
//! `PersistPolicy`).

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::{ChatSession, SessionMeta};

/// Storage-layer failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found in storage: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stored session: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Port the engine persists sessions through
///
/// Four verbs plus the current-session pointer; the engine does not
/// depend on anything beyond these.
pub trait SessionStore: Send + Sync {
    fn save_session(&self, session: &ChatSession) -> Result<(), StorageError>;
    fn load_session(&self, id: &str) -> Result<ChatSession, StorageError>;
    /// Every stored session, in no particular order
    fn load_all(&self) -> Result<Vec<ChatSession>, StorageError>;
    /// Listing metadata, most recently updated first
    fn list_sessions(&self) -> Result<Vec<SessionMeta>, StorageError>;
    fn delete_session(&self, id: &str) -> Result<(), StorageError>;

    fn current_session_id(&self) -> Option<String>;
    fn set_current_session(&self, id: &str) -> Result<(), StorageError>;
    fn clear_current_session(&self) -> Result<(), StorageError>;
}

/// JSON-file session store
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Initialize storage under `root`, creating the directory structure
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("sessions"))?;
        Ok(Self { root })
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{id}.json"))
    }

    fn current_file(&self) -> PathBuf {
        self.sessions_dir().join("current")
    }
}

impl SessionStore for JsonStorage {
    fn save_session(&self, session: &ChatSession) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(self.session_path(&session.id), content)?;
        Ok(())
    }

    fn load_session(&self, id: &str) -> Result<ChatSession, StorageError> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_all(&self) -> Result<Vec<ChatSession>, StorageError> {
        let mut sessions = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.sessions_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    // A corrupt file loses one session, not the whole list.
                    match std::fs::read_to_string(&path)
                        .map_err(StorageError::from)
                        .and_then(|c| Ok(serde_json::from_str::<ChatSession>(&c)?))
                    {
                        Ok(session) => sessions.push(session),
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %err, "skipping unreadable session file");
                        }
                    }
                }
            }
        }
        Ok(sessions)
    }

    fn list_sessions(&self) -> Result<Vec<SessionMeta>, StorageError> {
        let mut metas: Vec<SessionMeta> =
            self.load_all()?.iter().map(SessionMeta::from).collect();
        metas.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(metas)
    }

    fn delete_session(&self, id: &str) -> Result<(), StorageError> {
        let path = self.session_path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        // If this was the current session, drop the pointer too.
        if self.current_session_id().as_deref() == Some(id) {
            self.clear_current_session()?;
        }
        Ok(())
    }

    fn current_session_id(&self) -> Option<String> {
        std::fs::read_to_string(self.current_file())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn set_current_session(&self, id: &str) -> Result<(), StorageError> {
        std::fs::write(self.current_file(), id)?;
        Ok(())
    }

    fn clear_current_session(&self) -> Result<(), StorageError> {
        let path = self.current_file();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
