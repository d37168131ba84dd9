//! In-memory document. Used by tests and as the scratch buffer when no note is configured.

use crate::domain::DomainError;
use crate::ports::DocumentPort;
use tokio::sync::RwLock;

pub struct MemoryDocument {
    content: RwLock<String>,
}

impl MemoryDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: RwLock::new(content.into()),
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait::async_trait]
impl DocumentPort for MemoryDocument {
    async fn get(&self) -> Result<String, DomainError> {
        Ok(self.content.read().await.clone())
    }

    async fn set(&self, content: &str) -> Result<(), DomainError> {
        *self.content.write().await = content.to_string();
        Ok(())
    }
}
