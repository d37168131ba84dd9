//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Note, Notice, SessionSnapshot};
use tokio::sync::mpsc;

/// Finite, non-restartable sequence of generated text chunks.
/// The sender side closes the channel when generation ends.
pub type ChunkReceiver = mpsc::Receiver<Result<String, DomainError>>;

/// Text-generation collaborator (LLM backend).
#[async_trait::async_trait]
pub trait GenerationPort: Send + Sync {
    /// Start generating for `prompt` and return the chunk stream.
    ///
    /// Errors returned here (auth, HTTP status) happen before any chunk;
    /// errors inside the stream are mid-generation failures.
    async fn generate(&self, prompt: &str) -> Result<ChunkReceiver, DomainError>;
}

/// Externally owned document content. Durability is the adapter's concern.
#[async_trait::async_trait]
pub trait DocumentPort: Send + Sync {
    async fn get(&self) -> Result<String, DomainError>;

    async fn set(&self, content: &str) -> Result<(), DomainError>;
}

/// Advisory success/failure events for the hosting UI. Fire-and-forget.
pub trait NotifierPort: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Session persistence. Saves context + history between runs.
#[async_trait::async_trait]
pub trait SessionStorePort: Send + Sync {
    /// Load the last saved snapshot. Returns `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<SessionSnapshot>, DomainError>;

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), DomainError>;
}

/// Note storage. Minimal surface the assistant needs to edit a stored note.
#[async_trait::async_trait]
pub trait NoteRepoPort: Send + Sync {
    async fn create_note(&self, title: &str, content: &str) -> Result<Note, DomainError>;

    /// Returns `None` if no note has this id.
    async fn get_note(&self, id: i64) -> Result<Option<Note>, DomainError>;

    /// All notes, most recently updated first.
    async fn list_notes(&self) -> Result<Vec<Note>, DomainError>;

    /// Fails with `NotFound` if no note has this id.
    async fn update_content(&self, id: i64, content: &str) -> Result<(), DomainError>;

    async fn delete_note(&self, id: i64) -> Result<(), DomainError>;
}
