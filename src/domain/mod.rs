//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the marker codec and prompt rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod markers;
pub mod prompt;

pub use entities::{
    AssistantContext, ChatTurn, Note, Notice, NoticeLevel, Role, SessionSnapshot,
};
pub use errors::DomainError;
pub use markers::{MarkedSection, MarkerStats};
