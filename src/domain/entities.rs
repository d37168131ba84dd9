//! Domain entities. Pure data structures for the assistant core.
//!
//! No HTTP/storage types here — adapters map into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message in the chat history.
///
/// `seq` is assigned by the session and never reused; it lets in-flight
/// operations find their target after deletions shift positional indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub seq: u64,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>, seq: u64) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
            seq,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Free-form metadata used to steer prompts. Whitespace-only values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantContext {
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub table_of_contents: Option<String>,
    #[serde(default)]
    pub key_points: Option<String>,
}

impl AssistantContext {
    pub fn document_type(&self) -> Option<&str> {
        present(&self.document_type)
    }

    pub fn tone(&self) -> Option<&str> {
        present(&self.tone)
    }

    pub fn audience(&self) -> Option<&str> {
        present(&self.audience)
    }

    pub fn table_of_contents(&self) -> Option<&str> {
        present(&self.table_of_contents)
    }

    pub fn key_points(&self) -> Option<&str> {
        present(&self.key_points)
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// Advisory event for the hosting UI. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }
}

/// Persistable view of a session: context plus history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub context: AssistantContext,
    pub history: Vec<ChatTurn>,
}

/// A stored note. Only the fields the assistant needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub updated_at: i64,
}
