//! Chat message DTOs

use crate::entities::{ChatMessage, User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire form of a chat message. `userId` is the sender.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDTO {
    pub id: i32,
    pub project_id: Option<i32>,
    pub user_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub attachment_path: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_size: Option<i64>,
}

impl From<ChatMessage> for ChatMessageDTO {
    fn from(value: ChatMessage) -> Self {
        Self {
            id: value.message_id,
            project_id: value.project_id,
            user_id: value.sender_id,
            recipient_id: value.recipient_id,
            content: value.content,
            is_read: value.is_read,
            created_at: value.created_at,
            attachment_path: value.attachment_path,
            attachment_name: value.attachment_name,
            attachment_type: value.attachment_type,
            attachment_size: value.attachment_size,
        }
    }
}

/// DTO to persist a new message (without message_id)
#[derive(Debug, Clone)]
pub struct CreateChatMessageDTO {
    pub project_id: Option<i32>,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub attachment: Option<StoredAttachment>,
}

/// Attachment already written to disk, ready to be referenced by a message row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAttachment {
    pub path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
}

/// Small summary of the sender pushed along with a `new_message` event
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SenderSummaryDTO {
    pub id: i32,
    pub username: String,
    pub full_name: String,
}

impl From<&User> for SenderSummaryDTO {
    fn from(value: &User) -> Self {
        Self {
            id: value.user_id,
            username: value.username.clone(),
            full_name: value.full_name.clone(),
        }
    }
}

impl SenderSummaryDTO {
    /// Name shown to humans: full name, falling back to the username
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewMessagePayload {
    pub message: ChatMessageDTO,
    pub from: SenderSummaryDTO,
}

/// The other participant of a conversation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientDTO {
    pub id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<UserRole>,
}

impl From<User> for RecipientDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.user_id,
            username: value.username,
            full_name: Some(value.full_name),
            avatar: value.avatar,
            role: Some(value.role),
        }
    }
}

impl RecipientDTO {
    /// Stand-in for a recipient that no longer exists
    pub fn unknown(id: i32) -> Self {
        Self {
            id,
            username: "Unknown user".to_string(),
            full_name: None,
            avatar: None,
            role: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationDTO {
    pub messages: Vec<ChatMessageDTO>,
    pub recipient: RecipientDTO,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct UnreadCountDTO {
    pub count: i64,
}
