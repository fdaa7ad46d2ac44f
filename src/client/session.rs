//! Chat session - Stato locale della chat lato client
//!
//! Riduttore puro: nessun I/O, solo transizioni di stato guidate dalle risposte HTTP e
//! dagli eventi del socket.

use crate::client::api::OutgoingAttachment;
use crate::client::relevance::{ChatView, Toast};
use crate::dtos::{ChatMessageDTO, Conversation, ConversationDTO, DeadlineItem, RecipientDTO};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ChatSession {
    view: ChatView,
    messages: Vec<ChatMessageDTO>,
    recipient: Option<RecipientDTO>,
    // at most one file selected at a time
    pending_attachment: Option<OutgoingAttachment>,
    unread_count: i64,
    deadlines: Vec<DeadlineItem>,
    toasts: VecDeque<Toast>,
    connected: bool,
}

impl ChatSession {
    pub fn new(view: ChatView) -> Self {
        Self {
            view,
            messages: Vec::new(),
            recipient: None,
            pending_attachment: None,
            unread_count: 0,
            deadlines: Vec::new(),
            toasts: VecDeque::new(),
            connected: false,
        }
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Cambia conversazione: messaggi e allegato della precedente vengono scartati
    pub fn set_conversation(&mut self, conversation: Conversation) {
        if self.view.conversation != conversation {
            self.view.conversation = conversation;
            self.messages.clear();
            self.recipient = None;
            self.pending_attachment = None;
        }
    }

    /// Sostituisce la lista messaggi con quella appena caricata
    pub fn apply_conversation(&mut self, conversation: ConversationDTO) {
        self.messages = conversation.messages;
        self.recipient = Some(conversation.recipient);
    }

    pub fn messages(&self) -> &[ChatMessageDTO] {
        &self.messages
    }

    pub fn recipient(&self) -> Option<&RecipientDTO> {
        self.recipient.as_ref()
    }

    /// Aggiorna un messaggio già presente (es. dopo la conferma di lettura)
    pub fn apply_message(&mut self, message: ChatMessageDTO) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        }
    }

    /// Ultimo messaggio non letto indirizzato all'utente corrente.
    /// Solo questo viene segnato come letto, non tutto il lotto.
    pub fn latest_unread_for_me(&self) -> Option<i32> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_read && m.recipient_id == self.view.current_user_id)
            .map(|m| m.id)
    }

    /// Seleziona un file; ritorna quello eventualmente sostituito
    pub fn select_attachment(&mut self, attachment: OutgoingAttachment) -> Option<OutgoingAttachment> {
        self.pending_attachment.replace(attachment)
    }

    pub fn clear_attachment(&mut self) {
        self.pending_attachment = None;
    }

    pub fn pending_attachment(&self) -> Option<&OutgoingAttachment> {
        self.pending_attachment.as_ref()
    }

    pub fn set_unread_count(&mut self, count: i64) {
        self.unread_count = count;
    }

    pub fn unread_count(&self) -> i64 {
        self.unread_count
    }

    /// Ogni push `deadlines` è autoritativo: sostituzione completa, nessun merge
    pub fn replace_deadlines(&mut self, deadlines: Vec<DeadlineItem>) {
        self.deadlines = deadlines;
    }

    pub fn deadlines(&self) -> &[DeadlineItem] {
        &self.deadlines
    }

    pub fn push_toast(&mut self, toast: Toast) {
        self.toasts.push_back(toast);
    }

    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        self.toasts.drain(..).collect()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DeadlineKind;
    use chrono::Utc;

    fn message(id: i32, sender: i32, recipient: i32, is_read: bool) -> ChatMessageDTO {
        ChatMessageDTO {
            id,
            project_id: None,
            user_id: sender,
            recipient_id: recipient,
            content: format!("message {}", id),
            is_read,
            created_at: Utc::now(),
            attachment_path: None,
            attachment_name: None,
            attachment_type: None,
            attachment_size: None,
        }
    }

    fn session() -> ChatSession {
        ChatSession::new(ChatView::new(2, Conversation::direct(1)))
    }

    #[test]
    fn test_latest_unread_for_me_picks_last_inbound() {
        let mut session = session();
        session.apply_conversation(ConversationDTO {
            messages: vec![
                message(1, 1, 2, false),
                message(2, 1, 2, false),
                message(3, 2, 1, false), // outbound, ignored
                message(4, 1, 2, true),
            ],
            recipient: RecipientDTO::unknown(1),
        });
        assert_eq!(session.latest_unread_for_me(), Some(2));

        session.apply_message(message(2, 1, 2, true));
        assert_eq!(session.latest_unread_for_me(), Some(1));
    }

    #[test]
    fn test_single_attachment_slot() {
        let mut session = session();
        let first = OutgoingAttachment::new("a.txt", "text/plain", b"a".to_vec());
        let second = OutgoingAttachment::new("b.txt", "text/plain", b"b".to_vec());

        assert!(session.select_attachment(first.clone()).is_none());
        assert_eq!(session.select_attachment(second.clone()), Some(first));
        assert_eq!(session.pending_attachment(), Some(&second));

        session.clear_attachment();
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn test_switching_conversation_resets_thread() {
        let mut session = session();
        session.apply_conversation(ConversationDTO {
            messages: vec![message(1, 1, 2, false)],
            recipient: RecipientDTO::unknown(1),
        });
        session.select_attachment(OutgoingAttachment::new("a.txt", "text/plain", vec![]));

        session.set_conversation(Conversation::project(10, 1));

        assert!(session.messages().is_empty());
        assert!(session.recipient().is_none());
        assert!(session.pending_attachment().is_none());
    }

    #[test]
    fn test_deadlines_are_replaced_wholesale() {
        let mut session = session();
        let item = |id| DeadlineItem {
            id,
            project_id: 1,
            project_title: "Site".to_string(),
            title: "Launch".to_string(),
            deadline: Utc::now(),
            kind: DeadlineKind::Project,
            status: "new".to_string(),
        };

        session.replace_deadlines(vec![item(1), item(2)]);
        session.replace_deadlines(vec![item(3)]);
        assert_eq!(
            session.deadlines().iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![3]
        );

        session.replace_deadlines(Vec::new());
        assert!(session.deadlines().is_empty());
    }
}
