//! ChatMessageRepository - Repository per la gestione dei messaggi di chat

use super::{Create, Read};
use crate::dtos::{Conversation, CreateChatMessageDTO};
use crate::entities::ChatMessage;
use sqlx::{Error, SqlitePool};

const MESSAGE_COLUMNS: &str = "message_id, project_id, sender_id, recipient_id, content, is_read, created_at, \
     attachment_path, attachment_name, attachment_type, attachment_size";

#[derive(Clone)]
pub struct ChatMessageRepository {
    connection_pool: SqlitePool,
}

impl ChatMessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Messages exchanged between `user_id` and the recipient of `conversation`, oldest first.
    ///
    /// Direct conversations only match rows without a project; project conversations only
    /// match rows of that project.
    pub async fn find_conversation(
        &self,
        conversation: &Conversation,
        user_id: &i32,
    ) -> Result<Vec<ChatMessage>, Error> {
        let recipient_id = conversation.recipient_id();

        let messages = match conversation.project_id() {
            None => {
                sqlx::query_as::<_, ChatMessage>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM chat_messages
                    WHERE project_id IS NULL
                      AND ((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?))
                    ORDER BY created_at ASC, message_id ASC
                    "#
                ))
                .bind(user_id)
                .bind(recipient_id)
                .bind(recipient_id)
                .bind(user_id)
                .fetch_all(&self.connection_pool)
                .await?
            }
            Some(project_id) => {
                sqlx::query_as::<_, ChatMessage>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM chat_messages
                    WHERE project_id = ?
                      AND ((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?))
                    ORDER BY created_at ASC, message_id ASC
                    "#
                ))
                .bind(project_id)
                .bind(user_id)
                .bind(recipient_id)
                .bind(recipient_id)
                .bind(user_id)
                .fetch_all(&self.connection_pool)
                .await?
            }
        };

        Ok(messages)
    }

    /// Whether two users already exchanged at least one direct message
    pub async fn has_direct_history(&self, user_a: &i32, user_b: &i32) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chat_messages
            WHERE project_id IS NULL
              AND ((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?))
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count > 0)
    }

    /// Marks a message as read. Idempotent: returns the number of rows actually flipped.
    pub async fn mark_as_read(&self, message_id: &i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = 1 WHERE message_id = ? AND is_read = 0",
        )
        .bind(message_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Unread messages addressed to `user_id`, across every conversation
    pub async fn count_unread(&self, user_id: &i32) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count)
    }
}

impl Create<ChatMessage, CreateChatMessageDTO> for ChatMessageRepository {
    async fn create(&self, data: &CreateChatMessageDTO) -> Result<ChatMessage, Error> {
        let attachment = data.attachment.as_ref();

        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages
                (project_id, sender_id, recipient_id, content, is_read, created_at,
                 attachment_path, attachment_name, attachment_type, attachment_size)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.project_id)
        .bind(data.sender_id)
        .bind(data.recipient_id)
        .bind(&data.content)
        .bind(data.created_at)
        .bind(attachment.map(|a| a.path.as_str()))
        .bind(attachment.map(|a| a.original_name.as_str()))
        .bind(attachment.map(|a| a.mime_type.as_str()))
        .bind(attachment.map(|a| a.size))
        .execute(&self.connection_pool)
        .await?;

        Ok(ChatMessage {
            message_id: result.last_insert_rowid() as i32,
            project_id: data.project_id,
            sender_id: data.sender_id,
            recipient_id: data.recipient_id,
            content: data.content.clone(),
            is_read: false,
            created_at: data.created_at,
            attachment_path: attachment.map(|a| a.path.clone()),
            attachment_name: attachment.map(|a| a.original_name.clone()),
            attachment_type: attachment.map(|a| a.mime_type.clone()),
            attachment_size: attachment.map(|a| a.size),
        })
    }
}

impl Read<ChatMessage, i32> for ChatMessageRepository {
    async fn read(&self, id: &i32) -> Result<Option<ChatMessage>, Error> {
        let message = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE message_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(message)
    }
}
