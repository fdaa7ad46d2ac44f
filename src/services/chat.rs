//! Chat services - Conversazioni dirette e di progetto, lettura e invio messaggi
//!
//! L'invio persiste il messaggio e poi, in modo esplicito, notifica il destinatario via
//! WebSocket. La notifica non può far fallire la richiesta.

use crate::core::{AppError, AppState};
use crate::dtos::{
    ChatMessageDTO, Conversation, ConversationDTO, CreateChatMessageDTO, RecipientDTO,
    SenderSummaryDTO, UnreadCountDTO,
};
use crate::entities::{Project, User};
use crate::repositories::{Create, Read};
use crate::services::uploads::{MAX_CHAT_ATTACHMENT_BYTES, PendingAttachment};
use axum::{
    Extension,
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Lunghezza massima del testo di un messaggio, in caratteri
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Corpo multipart di un invio: campo testo `content` e file opzionale `attachment`
#[derive(Debug, Default)]
pub struct MessageForm {
    pub content: String,
    pub attachment: Option<PendingAttachment>,
}

impl MessageForm {
    #[instrument(skip(multipart))]
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MessageForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("content") => form.content = field.text().await?,
                Some("attachment") => {
                    if form.attachment.is_some() {
                        return Err(AppError::bad_request("Only one attachment is allowed"));
                    }
                    form.attachment =
                        Some(PendingAttachment::read_field(field, MAX_CHAT_ATTACHMENT_BYTES).await?);
                }
                other => debug!(field = ?other, "Ignoring unknown multipart field"),
            }
        }

        Ok(form)
    }

    /// Testo non vuoto oppure allegato; testo entro il limite
    pub fn validate(&self) -> Result<(), AppError> {
        if self.content.trim().is_empty() && self.attachment.is_none() {
            return Err(AppError::bad_request("Message must have content or an attachment"));
        }
        if self.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::bad_request("Message too long").with_details(format!(
                "Messages are limited to {} characters",
                MAX_MESSAGE_CHARS
            )));
        }
        Ok(())
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_direct_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(recipient_id): Path<i32>,
) -> Result<Json<ConversationDTO>, AppError> {
    debug!(recipient_id, "Fetching direct conversation");
    load_conversation(&state, &current_user, Conversation::direct(recipient_id)).await
}

#[instrument(skip(state, current_user, project), fields(user_id = %current_user.user_id, project_id = %project.project_id))]
pub async fn get_project_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(project): Extension<Project>, // verificato da project_access_middleware
    Path((_, recipient_id)): Path<(i32, i32)>,
) -> Result<Json<ConversationDTO>, AppError> {
    debug!(recipient_id, "Fetching project conversation");
    load_conversation(
        &state,
        &current_user,
        Conversation::project(project.project_id, recipient_id),
    )
    .await
}

async fn load_conversation(
    state: &AppState,
    current_user: &User,
    conversation: Conversation,
) -> Result<Json<ConversationDTO>, AppError> {
    // 1. Destinatario: se non esiste più, lista vuota e destinatario segnaposto
    let recipient = match state.user.read(&conversation.recipient_id()).await? {
        Some(user) => user,
        None => {
            warn!(
                recipient_id = conversation.recipient_id(),
                "Recipient not found, returning empty conversation"
            );
            return Ok(Json(ConversationDTO {
                messages: Vec::new(),
                recipient: RecipientDTO::unknown(conversation.recipient_id()),
            }));
        }
    };

    // 2. Messaggi tra i due utenti, nel solo ambito della conversazione
    let messages: Vec<ChatMessageDTO> = state
        .chat
        .find_conversation(&conversation, &current_user.user_id)
        .await?
        .into_iter()
        .map(ChatMessageDTO::from)
        .collect();

    info!(count = messages.len(), "Conversation loaded");
    Ok(Json(ConversationDTO {
        messages,
        recipient: RecipientDTO::from(recipient),
    }))
}

#[instrument(skip(state, current_user, multipart), fields(user_id = %current_user.user_id))]
pub async fn send_direct_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(recipient_id): Path<i32>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ChatMessageDTO>), AppError> {
    debug!(recipient_id, "Sending direct message");
    let form = MessageForm::from_multipart(multipart).await?;
    form.validate()?;

    // Solo gli admin possono iniziare una conversazione diretta, i client possono solo rispondere
    if !current_user.is_admin()
        && !state
            .chat
            .has_direct_history(&current_user.user_id, &recipient_id)
            .await?
    {
        warn!(recipient_id, "Client tried to start a direct conversation");
        return Err(AppError::forbidden("You cannot start a direct conversation")
            .with_details("Wait for an administrator to contact you"));
    }

    send_message(&state, &current_user, Conversation::direct(recipient_id), form).await
}

#[instrument(skip(state, current_user, project, multipart), fields(user_id = %current_user.user_id, project_id = %project.project_id))]
pub async fn send_project_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(project): Extension<Project>, // verificato da project_access_middleware
    Path((_, recipient_id)): Path<(i32, i32)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ChatMessageDTO>), AppError> {
    debug!(recipient_id, "Sending project message");
    let form = MessageForm::from_multipart(multipart).await?;
    form.validate()?;

    send_message(
        &state,
        &current_user,
        Conversation::project(project.project_id, recipient_id),
        form,
    )
    .await
}

async fn send_message(
    state: &AppState,
    current_user: &User,
    conversation: Conversation,
    form: MessageForm,
) -> Result<(StatusCode, Json<ChatMessageDTO>), AppError> {
    // 1. Il destinatario deve esistere
    let recipient_id = conversation.recipient_id();
    if state.user.read(&recipient_id).await?.is_none() {
        warn!(recipient_id, "Recipient not found");
        return Err(AppError::not_found("Recipient not found"));
    }

    // 2. Allegato su disco prima della riga
    let stored = match &form.attachment {
        Some(pending) => Some(state.attachments.store_chat_attachment(pending).await?),
        None => None,
    };

    // 3. Persistenza; se fallisce l'allegato orfano viene rimosso
    let data = CreateChatMessageDTO {
        project_id: conversation.project_id(),
        sender_id: current_user.user_id,
        recipient_id,
        content: form.content,
        created_at: Utc::now(),
        attachment: stored.clone(),
    };
    let message = match state.chat.create(&data).await {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to persist chat message: {:?}", e);
            if let Some(stored) = &stored {
                state.attachments.discard(stored).await;
            }
            return Err(e.into());
        }
    };

    let message = ChatMessageDTO::from(message);
    info!(message_id = message.id, "Chat message stored");

    // 4. Notifica al solo destinatario, fire-and-forget
    state
        .notifier
        .notify_new_message(&message, SenderSummaryDTO::from(current_user));

    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(message_id): Path<i32>,
) -> Result<Json<ChatMessageDTO>, AppError> {
    debug!(message_id, "Marking message as read");
    // 1. Solo il destinatario può segnare il messaggio come letto
    let message = state
        .chat
        .read(&message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    if message.recipient_id != current_user.user_id {
        warn!(message_id, "Only the recipient can mark a message as read");
        return Err(AppError::forbidden("Only the recipient can mark a message as read"));
    }

    // 2. Idempotente: un messaggio già letto resta letto
    if message.is_read {
        return Ok(Json(ChatMessageDTO::from(message)));
    }
    state.chat.mark_as_read(&message_id).await?;

    let updated = state
        .chat
        .read(&message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    Ok(Json(ChatMessageDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<UnreadCountDTO>, AppError> {
    let count = state.chat.count_unread(&current_user.user_id).await?;
    debug!(count, "Unread messages counted");
    Ok(Json(UnreadCountDTO { count }))
}
