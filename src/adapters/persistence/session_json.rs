//! Implements SessionStorePort using a JSON file.
//!
//! Persists assistant context and chat history between runs.

use crate::adapters::document::file::write_atomic;
use crate::domain::{DomainError, SessionSnapshot};
use crate::ports::SessionStorePort;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// JSON file-based session storage.
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl SessionStorePort for JsonSessionStore {
    /// A corrupt file is logged and treated as no saved session.
    async fn load(&self) -> Result<Option<SessionSnapshot>, DomainError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DomainError::Repo(format!("read session: {}", e))),
        };
        match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) => {
                info!(
                    path = %self.path.display(),
                    turns = snapshot.history.len(),
                    "session loaded"
                );
                Ok(Some(snapshot))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable; starting fresh");
                Ok(None)
            }
        }
    }

    /// Atomic save using the write-replace pattern.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|e| DomainError::Repo(format!("save session: {}", e)))?;
        info!(path = %self.path.display(), turns = snapshot.history.len(), "session saved");
        Ok(())
    }
}
