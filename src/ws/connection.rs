//! WebSocket Connection Management - Ciclo di vita di un singolo socket
//!
//! Il socket viene diviso in due metà: un task di scrittura possiede il sink e consuma il
//! canale [`Outbound`] della connessione, mentre il loop di lettura gestisce frame `auth`,
//! pong e chiusura.

use crate::AppState;
use crate::dtos::{ClientEvent, ServerEvent};
use crate::entities::User;
use crate::ws::registry::{Connection, Outbound};
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{Span, debug, info, instrument, warn};

/// Messaggio informativo inviato appena il socket è aperto
pub const WELCOME_MESSAGE: &str = "Connected to notification server";

#[instrument(skip(ws, state, current_user), fields(user_id = %current_user.user_id, connection_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, current_user: User) {
    let (connection, outbound_rx) = state.connections.accept();
    Span::current().record("connection_id", connection.id());
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, mut ws_rx) = ws.split();
    tokio::spawn(write_ws(ws_tx, outbound_rx, connection.clone()));

    connection.mark_open();
    connection.send_event(&ServerEvent::Connection {
        message: WELCOME_MESSAGE.to_string(),
    });

    loop {
        tokio::select! {
            _ = connection.terminated() => {
                info!("Connection terminated by the server");
                break;
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_client_frame(&state, &connection, &current_user, text.as_str()).await;
                }
                Some(Ok(Message::Pong(_))) => connection.mark_alive(),
                Some(Ok(Message::Ping(_))) => {
                    // the pong reply is queued by the transport itself
                    debug!("Ping received from client");
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Binary frame ignored");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(reason = ?frame, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {:?}", e);
                    break;
                }
                None => {
                    info!("WebSocket stream ended");
                    break;
                }
            }
        }
    }

    // Cleanup
    state.connections.unregister(connection.id());
    connection.terminate();
    info!(
        online_users = state.connections.online_user_count(),
        "Connection cleaned up"
    );
}

/// Gestisce un frame testuale del client. Frame malformati vengono loggati e scartati.
async fn handle_client_frame(
    state: &Arc<AppState>,
    connection: &Arc<Connection>,
    current_user: &User,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to deserialize client frame: {}", e);
            return;
        }
    };

    match event {
        ClientEvent::Auth { user_id } => {
            if user_id != current_user.user_id {
                warn!(
                    announced_user_id = user_id,
                    "Auth frame does not match the authenticated user, ignored"
                );
                return;
            }
            if !state.connections.register(user_id, connection) {
                return;
            }
            // push immediato delle scadenze, senza attendere una mutazione
            state.notifier.refresh_deadlines(user_id).await;
        }
    }
}

#[instrument(skip_all, fields(connection_id = connection.id()))]
async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: UnboundedReceiver<Outbound>,
    connection: Arc<Connection>,
) {
    debug!("Write task started");

    while let Some(outbound) = outbound_rx.recv().await {
        let result = match outbound {
            Outbound::Frame(text) => websocket_tx.send(Message::Text(text)).await,
            Outbound::Ping => websocket_tx.send(Message::Ping(Bytes::new())).await,
            Outbound::Close => {
                let _ = websocket_tx.send(Message::Close(None)).await;
                break;
            }
        };

        // a dead transport is not retried, the sweep reaps it
        if let Err(e) = result {
            warn!("Failed to write to WebSocket: {:?}", e);
            connection.mark_closed();
            break;
        }
    }

    debug!("Write task terminated");
}
