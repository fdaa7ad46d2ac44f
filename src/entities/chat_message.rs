//! Chat message entity

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessage {
    pub message_id: i32,
    // NULL for direct conversations
    pub project_id: Option<i32>,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    // attachment columns are either all set or all NULL
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_size: Option<i64>,
}

impl ChatMessage {
    pub fn is_direct(&self) -> bool {
        self.project_id.is_none()
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment_path.is_some()
    }
}
