//! HTTP API client - Endpoint della chat consumati dal client
//!
//! [`ChatBackend`] separa la logica della sessione dal trasporto, così la logica di chat si
//! prova con un backend in memoria.

use crate::client::ClientError;
use crate::dtos::{ChatMessageDTO, Conversation, ConversationDTO, UnreadCountDTO};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// File scelto dall'utente, non ancora inviato
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl OutgoingAttachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Operazioni HTTP di cui ha bisogno la chat
pub trait ChatBackend {
    async fn fetch_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationDTO, ClientError>;

    async fn send_message(
        &self,
        conversation: &Conversation,
        content: &str,
        attachment: Option<OutgoingAttachment>,
    ) -> Result<ChatMessageDTO, ClientError>;

    async fn mark_read(&self, message_id: i32) -> Result<ChatMessageDTO, ClientError>;

    async fn unread_count(&self) -> Result<i64, ClientError>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Client HTTP autenticato con token Bearer.
///
/// Cheap to clone, the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PortalApi {
    client: Client,
    base_url: String,
    token: String,
}

impl PortalApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// `POST /api/auth/login`, il token arriva nell'header Authorization
    #[instrument(skip(password))]
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let api = Self::new(base_url, String::new())?;
        let path = "/auth/login";
        let resp = api
            .client
            .post(api.url(path))
            .json(&LoginBody { username, password })
            .send()
            .await?;
        let resp = check(resp, "POST", path)?;

        let token = resp
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ClientError::MissingToken)?
            .to_string();

        debug!("Logged in");
        Ok(Self { token, ..api })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// URL del socket derivato dalla base HTTP (`http` -> `ws`, `https` -> `wss`)
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/api/ws", base)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn check(resp: Response, method: &'static str, path: &str) -> Result<Response, ClientError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(ClientError::Status {
            method,
            path: path.to_string(),
            status: resp.status(),
        })
    }
}

impl ChatBackend for PortalApi {
    /// `GET /api/chat/direct/{r}` oppure `GET /api/projects/{p}/chat/{r}`
    async fn fetch_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationDTO, ClientError> {
        let path = conversation.path();
        let resp = self
            .client
            .get(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(check(resp, "GET", &path)?.json().await?)
    }

    /// Multipart con campo `content` e file opzionale `attachment`
    async fn send_message(
        &self,
        conversation: &Conversation,
        content: &str,
        attachment: Option<OutgoingAttachment>,
    ) -> Result<ChatMessageDTO, ClientError> {
        let path = conversation.path();
        let mut form = Form::new().text("content", content.to_string());
        if let Some(attachment) = attachment {
            let part = Part::bytes(attachment.bytes)
                .file_name(attachment.file_name)
                .mime_str(&attachment.mime_type)?;
            form = form.part("attachment", part);
        }

        let resp = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Ok(check(resp, "POST", &path)?.json().await?)
    }

    /// `PATCH /api/chat/messages/{id}/read`
    async fn mark_read(&self, message_id: i32) -> Result<ChatMessageDTO, ClientError> {
        let path = format!("/chat/messages/{}/read", message_id);
        let resp = self
            .client
            .patch(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(check(resp, "PATCH", &path)?.json().await?)
    }

    /// `GET /api/chat/unread`
    async fn unread_count(&self) -> Result<i64, ClientError> {
        let path = "/chat/unread";
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: UnreadCountDTO = check(resp, "GET", path)?.json().await?;
        Ok(body.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_from_http_base() {
        let api = PortalApi::new("http://localhost:3000/", "t").unwrap();
        assert_eq!(api.ws_url(), "ws://localhost:3000/api/ws");

        let api = PortalApi::new("https://portal.example.com", "t").unwrap();
        assert_eq!(api.ws_url(), "wss://portal.example.com/api/ws");
    }

    #[test]
    fn test_conversation_urls() {
        let api = PortalApi::new("http://localhost:3000", "t").unwrap();
        assert_eq!(
            api.url(&Conversation::direct(7).path()),
            "http://localhost:3000/api/chat/direct/7"
        );
        assert_eq!(
            api.url(&Conversation::project(10, 7).path()),
            "http://localhost:3000/api/projects/10/chat/7"
        );
    }
}
