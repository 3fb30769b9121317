use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
        }
    }
}

/// The five record kinds that can carry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RecordKind {
    Bookmark,
    Contact,
    Event,
    Note,
    Task,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Bookmark,
        RecordKind::Contact,
        RecordKind::Event,
        RecordKind::Note,
        RecordKind::Task,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Bookmark => "bookmark",
            RecordKind::Contact => "contact",
            RecordKind::Event => "event",
            RecordKind::Note => "note",
            RecordKind::Task => "task",
        }
    }

    /// Base table holding rows of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Bookmark => "bookmarks",
            RecordKind::Contact => "contacts",
            RecordKind::Event => "events",
            RecordKind::Note => "notes",
            RecordKind::Task => "tasks",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
