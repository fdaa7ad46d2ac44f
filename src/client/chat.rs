//! Chat client - Sessione di chat guidata da HTTP e socket
//!
//! Applica gli eventi del socket alla [`ChatSession`], esegue le azioni decise dalla
//! regola di rilevanza e gestisce la conferma di lettura con debounce.

use crate::client::relevance::{self, ChatAction, ChatView};
use crate::client::{ChatBackend, ChatSession, ClientError, SocketUpdate};
use crate::dtos::{ChatMessageDTO, Conversation, ServerEvent};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, warn};

/// Ritardo della conferma di lettura dopo il caricamento dei messaggi
pub const READ_RECEIPT_DELAY: Duration = Duration::from_secs(1);

pub struct ChatClient<B> {
    backend: B,
    session: ChatSession,
    read_receipt_at: Option<Instant>,
}

impl<B: ChatBackend> ChatClient<B> {
    pub fn new(backend: B, view: ChatView) -> Self {
        Self {
            backend,
            session: ChatSession::new(view),
            read_receipt_at: None,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Istante in cui partirà la prossima conferma di lettura, se programmata
    pub fn read_receipt_due(&self) -> Option<Instant> {
        self.read_receipt_at
    }

    /// Apre (o riapre) una conversazione e ne carica i messaggi
    pub async fn open_conversation(&mut self, conversation: Conversation) -> Result<(), ClientError> {
        self.session.set_conversation(conversation);
        self.refetch_conversation().await
    }

    #[instrument(skip(self))]
    pub async fn refetch_conversation(&mut self) -> Result<(), ClientError> {
        let conversation = self.session.view().conversation;
        let loaded = self.backend.fetch_conversation(&conversation).await?;
        debug!(count = loaded.messages.len(), "Conversation refetched");

        // the view may have moved while the request was in flight
        if self.session.view().conversation == conversation {
            self.session.apply_conversation(loaded);
            self.schedule_read_receipt();
        }
        Ok(())
    }

    pub async fn refetch_unread(&mut self) -> Result<(), ClientError> {
        let count = self.backend.unread_count().await?;
        self.session.set_unread_count(count);
        Ok(())
    }

    /// Ogni caricamento riarma il timer: raffiche di aggiornamenti producono una sola richiesta
    fn schedule_read_receipt(&mut self) {
        self.read_receipt_at = self
            .session
            .latest_unread_for_me()
            .map(|_| Instant::now() + READ_RECEIPT_DELAY);
    }

    /// Segna come letto solo l'ultimo messaggio non letto indirizzato all'utente
    #[instrument(skip(self))]
    pub async fn flush_read_receipt(&mut self) -> Result<Option<i32>, ClientError> {
        self.read_receipt_at = None;
        let Some(message_id) = self.session.latest_unread_for_me() else {
            return Ok(None);
        };

        let updated = self.backend.mark_read(message_id).await?;
        self.session.apply_message(updated);
        self.refetch_unread().await?;
        debug!(message_id, "Read receipt sent");
        Ok(Some(message_id))
    }

    /// Invia testo e allegato selezionato. Testo vuoto senza allegato: nessuna richiesta.
    /// In caso di errore l'allegato resta selezionato per riprovare.
    #[instrument(skip(self, content))]
    pub async fn send(&mut self, content: &str) -> Result<Option<ChatMessageDTO>, ClientError> {
        let content = content.trim();
        let attachment = self.session.pending_attachment().cloned();
        if content.is_empty() && attachment.is_none() {
            return Ok(None);
        }

        let conversation = self.session.view().conversation;
        let message = self
            .backend
            .send_message(&conversation, content, attachment)
            .await?;
        info!(message_id = message.id, "Message sent");

        // nessun append ottimistico: la lista si ricarica dal server
        self.session.clear_attachment();
        if let Err(e) = self.refetch_conversation().await {
            warn!(message_id = message.id, error = %e, "Refetch after send failed");
        }
        Ok(Some(message))
    }

    /// Applica un aggiornamento del socket
    pub async fn handle_update(&mut self, update: SocketUpdate) -> Result<(), ClientError> {
        match update {
            SocketUpdate::Connected => self.session.set_connected(true),
            SocketUpdate::Disconnected => self.session.set_connected(false),
            SocketUpdate::Event(event) => self.handle_event(event).await?,
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: ServerEvent) -> Result<(), ClientError> {
        match event {
            ServerEvent::Connection { message } => debug!(greeting = %message, "Server greeting"),
            ServerEvent::Deadlines { deadlines } => {
                debug!(count = deadlines.len(), "Deadlines replaced");
                self.session.replace_deadlines(deadlines);
            }
            ServerEvent::NewMessage { data } => {
                let actions = relevance::react(self.session.view(), &data);
                if actions.is_empty() {
                    debug!(message_id = data.message.id, "Message not relevant to the open view");
                }
                // ogni azione e' indipendente: un refetch fallito non blocca le altre
                for action in actions {
                    let outcome = match action {
                        ChatAction::RefetchConversation => self.refetch_conversation().await,
                        ChatAction::ShowToast(toast) => {
                            self.session.push_toast(toast);
                            Ok(())
                        }
                        ChatAction::RefetchUnreadCount => self.refetch_unread().await,
                    };
                    if let Err(e) = outcome {
                        warn!(message_id = data.message.id, error = %e, "Chat action failed");
                    }
                }
            }
        }
        Ok(())
    }

    /// Loop principale: eventi del socket e timer della conferma di lettura.
    /// Termina quando il canale degli aggiornamenti viene chiuso.
    pub async fn run(&mut self, mut updates: UnboundedReceiver<SocketUpdate>) {
        loop {
            let receipt_at = self.read_receipt_at;
            tokio::select! {
                update = updates.recv() => match update {
                    Some(update) => {
                        if let Err(e) = self.handle_update(update).await {
                            warn!("Failed to apply socket update: {}", e);
                        }
                    }
                    None => break,
                },
                _ = sleep_until(receipt_at.unwrap_or_else(Instant::now)), if receipt_at.is_some() => {
                    if let Err(e) = self.flush_read_receipt().await {
                        warn!("Failed to send read receipt: {}", e);
                    }
                }
            }
        }
    }
}
