//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use crate::domain::entities::Role;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Required input was empty; rejected before any state change.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Edit-mode collision (edit already active, or none active on commit).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Index {index} out of range (history has {len} turns)")]
    Index { index: usize, len: usize },

    #[error("Turn {index} is not a {expected} turn")]
    Role { index: usize, expected: Role },

    /// A generation is already in flight for this session.
    #[error("A generation is already in progress")]
    Busy,

    /// External generator failure: network, auth, malformed stream.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Malformed markers at byte {offset}: {reason}")]
    MalformedMarkers { offset: usize, reason: String },

    #[error("Document store error: {0}")]
    Document(String),

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal UI error: {0}")]
    Ui(String),
}
