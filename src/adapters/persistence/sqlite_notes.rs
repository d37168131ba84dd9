//! SQLite-backed note repository via libsql. Implements NoteRepoPort.
//!
//! Single `notes` table; all notes share one database file: data/notes.db.
//! `NoteDocument` exposes one note as a `DocumentPort` for the assistant.

use crate::domain::{DomainError, Note};
use crate::ports::{DocumentPort, NoteRepoPort};
use chrono::Utc;
use libsql::{params, Connection, Database, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const NOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    updated_at INTEGER NOT NULL
)"#;
const NOTES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes (updated_at DESC)";

fn repo_err(e: libsql::Error) -> DomainError {
    DomainError::Repo(e.to_string())
}

/// SQLite note repository. One database file (notes.db) in the given base directory.
pub struct SqliteNoteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteNoteRepo {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path = base.join("notes.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Repo(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(repo_err)?.is_some() {}

        conn.execute(NOTES_TABLE, ()).await.map_err(repo_err)?;
        conn.execute(NOTES_INDEX, ()).await.map_err(repo_err)?;

        info!(path = %db_path.display(), "SQLite note store connected");

        Ok(Self { db, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(repo_err)
    }

    fn row_to_note(row: &Row) -> Result<Note, DomainError> {
        Ok(Note {
            id: row.get(0).map_err(repo_err)?,
            title: row.get::<String>(1).unwrap_or_default(),
            content: row.get::<String>(2).unwrap_or_default(),
            updated_at: row.get(3).map_err(repo_err)?,
        })
    }
}

#[async_trait::async_trait]
impl NoteRepoPort for SqliteNoteRepo {
    async fn create_note(&self, title: &str, content: &str) -> Result<Note, DomainError> {
        let conn = self.conn()?;
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO notes (title, content, updated_at) VALUES (?1, ?2, ?3)",
            params![title, content, now],
        )
        .await
        .map_err(repo_err)?;
        let id = conn.last_insert_rowid();
        info!(note_id = id, "note created");
        Ok(Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            updated_at: now,
        })
    }

    async fn get_note(&self, id: i64) -> Result<Option<Note>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, title, content, updated_at FROM notes WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(Self::row_to_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_notes(&self) -> Result<Vec<Note>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, title, content, updated_at FROM notes ORDER BY updated_at DESC, id DESC",
                (),
            )
            .await
            .map_err(repo_err)?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            notes.push(Self::row_to_note(&row)?);
        }
        Ok(notes)
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE notes SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, Utc::now().timestamp(), id],
            )
            .await
            .map_err(repo_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }

    async fn delete_note(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM notes WHERE id = ?1", params![id])
            .await
            .map_err(repo_err)?;
        Ok(())
    }
}

/// One stored note seen as the assistant's document.
pub struct NoteDocument {
    repo: Arc<dyn NoteRepoPort>,
    note_id: i64,
}

impl NoteDocument {
    pub fn new(repo: Arc<dyn NoteRepoPort>, note_id: i64) -> Self {
        Self { repo, note_id }
    }
}

#[async_trait::async_trait]
impl DocumentPort for NoteDocument {
    async fn get(&self) -> Result<String, DomainError> {
        self.repo
            .get_note(self.note_id)
            .await?
            .map(|n| n.content)
            .ok_or_else(|| DomainError::Document(format!("note {} not found", self.note_id)))
    }

    async fn set(&self, content: &str) -> Result<(), DomainError> {
        self.repo
            .update_content(self.note_id, content)
            .await
            .map_err(|e| DomainError::Document(e.to_string()))
    }
}
