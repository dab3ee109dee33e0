//! Durable storage for the session record.
//!
//! Only the token pair and the user snapshot are ever written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::Session;
use crate::error::{ClientError, Result};

/// Default directory (relative to `$HOME`) holding client state.
pub const DEFAULT_STATE_DIR: &str = ".mentor";
/// File name of the persisted session record.
pub const SESSION_FILE: &str = "session.json";

/// Backend for the persisted session record.
pub trait SessionPersistence: Send + Sync {
    /// Load the record. `Ok(None)` when nothing was stored yet.
    fn load(&self) -> Result<Option<Session>>;

    /// Replace the stored record.
    fn save(&self, session: &Session) -> Result<()>;
}

// ============================================================================
// File persistence
// ============================================================================

/// Persists the session record as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.mentor/session.json`.
    pub fn default_path() -> PathBuf {
        let home = match std::env::var("HOME") {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("HOME not set, using /tmp for session state");
                "/tmp".to_string()
            }
        };
        PathBuf::from(home).join(DEFAULT_STATE_DIR).join(SESSION_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> Result<Option<Session>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Persistence(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        let session: Session = serde_json::from_str(&contents).map_err(|e| {
            ClientError::Persistence(format!("parsing {}: {}", self.path.display(), e))
        })?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let io_err =
            |e: std::io::Error| ClientError::Persistence(format!("writing {}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Persistence(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(io_err)?;
            let mut writer = std::io::BufWriter::new(file);
            writer.write_all(contents.as_bytes()).map_err(io_err)?;
            let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
            file.sync_all().map_err(io_err)?;
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&self.path, &contents).map_err(io_err)?;
        }

        Ok(())
    }
}

// ============================================================================
// In-memory persistence
// ============================================================================

/// Keeps the record in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    record: Mutex<Option<Session>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the record, as if a previous process had saved it.
    #[must_use]
    pub fn with_record(session: Session) -> Self {
        Self {
            record: Mutex::new(Some(session)),
        }
    }

    /// The last saved record.
    pub fn record(&self) -> Option<Session> {
        self.record.lock().expect("mutex poisoned").clone()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.record())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.record.lock().expect("mutex poisoned") = Some(session.clone());
        Ok(())
    }
}
