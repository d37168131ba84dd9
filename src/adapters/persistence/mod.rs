//! Persistence adapters. Session snapshots and stored notes.

pub mod session_json;
pub mod sqlite_notes;

pub use session_json::JsonSessionStore;
pub use sqlite_notes::{NoteDocument, SqliteNoteRepo};
