//! WebSocket Module - Gestione WebSocket per le notifiche real-time
//!
//! Questo modulo contiene:
//! - Registro delle connessioni per utente (fan-out)
//! - Ciclo di vita del singolo socket (split sender/receiver)
//! - Dispatcher delle notifiche `deadlines` e `new_message`
//! - Heartbeat di liveness

pub mod connection;
pub mod dispatcher;
pub mod heartbeat;
pub mod registry;

// Re-exports pubblici
pub use connection::handle_socket;
pub use dispatcher::NotificationDispatcher;
pub use heartbeat::{HEARTBEAT_INTERVAL, spawn_heartbeat};
pub use registry::{Connection, ConnectionId, ConnectionRegistry, ConnectionState};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Ottenere l'utente dall'autenticazione JWT
/// 2. Eseguire upgrade HTTP -> WebSocket
/// 3. Passare la connessione ad handle_socket
#[instrument(skip(ws, state, current_user), fields(user_id = %current_user.user_id))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione JWT
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, current_user))
}
