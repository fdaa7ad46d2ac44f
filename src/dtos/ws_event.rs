//! WebSocket Event DTOs - frames exchanged on the socket
//!
//! One JSON object per text frame, discriminated by the `type` field:
//! `{"type": "connection", "message": ...}`
//! `{"type": "deadlines", "deadlines": [...]}`
//! `{"type": "new_message", "data": {"message": ..., "from": ...}}`
//! `{"type": "auth", "userId": 1}` (client to server)

use crate::dtos::{DeadlineItem, NewMessagePayload};
use serde::{Deserialize, Serialize};

/// Frames pushed by the server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connection { message: String },
    Deadlines { deadlines: Vec<DeadlineItem> },
    NewMessage { data: NewMessagePayload },
}

/// Frames sent by the client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Auth { user_id: i32 },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connection { .. } => "connection",
            ServerEvent::Deadlines { .. } => "deadlines",
            ServerEvent::NewMessage { .. } => "new_message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::{ChatMessageDTO, SenderSummaryDTO};
    use serde_json::json;

    #[test]
    fn test_auth_frame_parses() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"auth","userId":42}"#).unwrap();
        assert_eq!(event, ClientEvent::Auth { user_id: 42 });
    }

    #[test]
    fn test_unknown_frame_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"hello"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"auth"}"#).is_err());
    }

    #[test]
    fn test_new_message_shape() {
        let event = ServerEvent::NewMessage {
            data: NewMessagePayload {
                message: ChatMessageDTO {
                    id: 5,
                    project_id: Some(10),
                    user_id: 1,
                    recipient_id: 2,
                    content: "hi".to_string(),
                    is_read: false,
                    created_at: chrono::Utc::now(),
                    attachment_path: None,
                    attachment_name: None,
                    attachment_type: None,
                    attachment_size: None,
                },
                from: SenderSummaryDTO {
                    id: 1,
                    username: "alice".to_string(),
                    full_name: "Alice Liddell".to_string(),
                },
            },
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("new_message"));
        assert_eq!(value["data"]["message"]["projectId"], json!(10));
        assert_eq!(value["data"]["message"]["userId"], json!(1));
        assert_eq!(value["data"]["message"]["recipientId"], json!(2));
        assert_eq!(value["data"]["message"]["content"], json!("hi"));
        assert_eq!(value["data"]["from"]["fullName"], json!("Alice Liddell"));
    }

    #[test]
    fn test_connection_shape() {
        let value = serde_json::to_value(ServerEvent::Connection {
            message: "welcome".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "connection", "message": "welcome"}));
    }
}
