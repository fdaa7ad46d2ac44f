//! Application State - Stato globale dell'applicazione
//!
//! Contiene tutti i repository, il registro delle connessioni WebSocket e il dispatcher
//! delle notifiche, costruiti una volta all'avvio e condivisi tra route e middleware.

use crate::repositories::{ChatMessageRepository, ProjectRepository, TaskRepository, UserRepository};
use crate::services::uploads::AttachmentStore;
use crate::ws::{ConnectionRegistry, NotificationDispatcher};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Repository per la gestione degli utenti
    pub user: UserRepository,

    /// Repository per la gestione dei progetti
    pub project: ProjectRepository,

    /// Repository per la gestione dei task
    pub task: TaskRepository,

    /// Repository per la gestione dei messaggi di chat
    pub chat: ChatMessageRepository,

    /// Secret key per la firma dei token JWT
    pub jwt_secret: String,

    /// Storage degli allegati di chat
    pub attachments: AttachmentStore,

    /// Connessioni WebSocket aperte, indicizzate per utente
    pub connections: Arc<ConnectionRegistry>,

    /// Calcolo e invio degli eventi `deadlines` e `new_message`
    pub notifier: NotificationDispatcher,
}

impl AppState {
    /// Crea una nuova istanza di AppState con un registro di connessioni vuoto
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni SQLite condiviso
    /// * `jwt_secret` - Chiave segreta per la firma dei token JWT
    /// * `upload_dir` - Directory radice degli upload
    pub fn new(pool: SqlitePool, jwt_secret: String, upload_dir: impl Into<PathBuf>) -> Self {
        let connections = Arc::new(ConnectionRegistry::new());
        let project = ProjectRepository::new(pool.clone());
        let task = TaskRepository::new(pool.clone());
        let notifier = NotificationDispatcher::new(connections.clone(), project.clone(), task.clone());

        Self {
            user: UserRepository::new(pool.clone()),
            project,
            task,
            chat: ChatMessageRepository::new(pool),
            jwt_secret,
            attachments: AttachmentStore::new(upload_dir),
            connections,
            notifier,
        }
    }
}
