use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant-wide note statistics for admin dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteStatistics {
    pub total_notes: i64,
    pub active_notes: i64,
    pub archived_notes: i64,
    pub notes_by_user: Vec<UserNoteCount>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserNoteCount {
    pub user_id: Uuid,
    pub user_name: String,
    pub note_count: i64,
}
