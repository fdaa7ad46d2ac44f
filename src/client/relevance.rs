//! Relevance - Un messaggio in arrivo appartiene alla conversazione visualizzata?
//!
//! Regola unica:
//! 1. la vista è diretta se non ha progetto, altrimenti di progetto;
//! 2. il messaggio si classifica allo stesso modo (`projectId` assente o `0` = diretto);
//! 3. le due classificazioni devono coincidere, e per i progetti anche l'id di progetto;
//! 4. mittente e destinatario devono essere esattamente l'utente corrente e il destinatario
//!    visualizzato, in uno qualsiasi dei due versi.

use crate::dtos::{ChatMessageDTO, Conversation, NewMessagePayload};

pub const NEW_MESSAGE_TOAST_TITLE: &str = "New message";

/// Conversazione visualizzata dall'utente corrente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatView {
    pub current_user_id: i32,
    pub conversation: Conversation,
}

impl ChatView {
    pub fn new(current_user_id: i32, conversation: Conversation) -> Self {
        Self {
            current_user_id,
            conversation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

/// Effetti richiesti alla UI da un evento `new_message`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    RefetchConversation,
    ShowToast(Toast),
    RefetchUnreadCount,
}

pub fn is_relevant(view: &ChatView, message: &ChatMessageDTO) -> bool {
    let incoming = Conversation::from_parts(message.project_id, message.recipient_id);

    if view.conversation.is_direct() != incoming.is_direct() {
        return false;
    }
    if view.conversation.project_id() != incoming.project_id() {
        return false;
    }

    let me = view.current_user_id;
    let them = view.conversation.recipient_id();
    (message.user_id == them && message.recipient_id == me)
        || (message.user_id == me && message.recipient_id == them)
}

/// Azioni per un evento `new_message`: nessuna se non rilevante, altrimenti refetch e, per i
/// soli messaggi in ingresso, toast e refetch del contatore dei non letti.
pub fn react(view: &ChatView, payload: &NewMessagePayload) -> Vec<ChatAction> {
    if !is_relevant(view, &payload.message) {
        return Vec::new();
    }

    let mut actions = vec![ChatAction::RefetchConversation];
    if payload.message.recipient_id == view.current_user_id {
        actions.push(ChatAction::ShowToast(Toast {
            title: NEW_MESSAGE_TOAST_TITLE.to_string(),
            description: format!("From {}", payload.from.display_name()),
        }));
        actions.push(ChatAction::RefetchUnreadCount);
    }
    actions
}
