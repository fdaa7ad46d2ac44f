//! Notification socket - Client WebSocket con riconnessione a intervallo fisso
//!
//! Ad ogni apertura invia il frame `auth`; ogni chiusura inattesa porta a un nuovo
//! tentativo dopo [`RECONNECT_DELAY`]. Lo stato di connessione è pubblicato su un canale
//! `watch`, gli eventi su un canale mpsc.

use crate::client::ClientError;
use crate::dtos::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tracing::{debug, info, instrument, warn};

/// Attesa costante tra due tentativi di connessione (nessun backoff esponenziale)
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// es. `ws://localhost:3000/api/ws`
    pub url: String,
    pub token: String,
    pub user_id: i32,
    pub reconnect_delay: Duration,
}

impl SocketConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>, user_id: i32) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            user_id,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketUpdate {
    Connected,
    Disconnected,
    Event(ServerEvent),
}

/// Frame malformati vengono loggati e scartati, lo stato resta invariato
pub fn parse_server_frame(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping malformed server frame: {}", e);
            None
        }
    }
}

/// Avvia il task del socket. Il task termina quando il ricevitore degli aggiornamenti viene chiuso.
pub fn spawn_socket(
    config: SocketConfig,
) -> (
    JoinHandle<()>,
    mpsc::UnboundedReceiver<SocketUpdate>,
    watch::Receiver<bool>,
) {
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let (connected_tx, connected_rx) = watch::channel(false);
    let handle = tokio::spawn(run(config, updates_tx, connected_tx));
    (handle, updates_rx, connected_rx)
}

#[instrument(skip_all, fields(user_id = config.user_id))]
async fn run(
    config: SocketConfig,
    updates: mpsc::UnboundedSender<SocketUpdate>,
    connected: watch::Sender<bool>,
) {
    loop {
        match connect_once(&config, &updates, &connected).await {
            Ok(()) => info!("Socket closed"),
            Err(e) => warn!("Socket error: {}", e),
        }

        if connected.send_replace(false) {
            let _ = updates.send(SocketUpdate::Disconnected);
        }

        if updates.is_closed() {
            debug!("Nobody listening, socket task stops");
            break;
        }

        tokio::time::sleep(config.reconnect_delay).await;
        debug!("Reconnecting");
    }
}

async fn connect_once(
    config: &SocketConfig,
    updates: &mpsc::UnboundedSender<SocketUpdate>,
    connected: &watch::Sender<bool>,
) -> Result<(), ClientError> {
    let mut request = config.url.as_str().into_client_request()?;
    request.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.token))?,
    );

    let (stream, _) = connect_async(request).await?;
    let (mut write, mut read) = stream.split();

    connected.send_replace(true);
    let _ = updates.send(SocketUpdate::Connected);
    info!("Socket connected");

    // annuncio dell'identità, subito dopo l'apertura
    let auth = serde_json::to_string(&ClientEvent::Auth {
        user_id: config.user_id,
    })?;
    write.send(Message::Text(auth)).await?;

    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => {
                if let Some(event) = parse_server_frame(&text) {
                    if updates.send(SocketUpdate::Event(event)).is_err() {
                        // receiver gone, close cleanly
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }
            Message::Close(frame) => {
                debug!(reason = ?frame, "Server closed the socket");
                break;
            }
            // pong replies are queued by tungstenite
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_frames() {
        assert_eq!(
            parse_server_frame(r#"{"type":"connection","message":"hi"}"#),
            Some(ServerEvent::Connection {
                message: "hi".to_string()
            })
        );
        assert_eq!(
            parse_server_frame(r#"{"type":"deadlines","deadlines":[]}"#),
            Some(ServerEvent::Deadlines { deadlines: vec![] })
        );
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        assert_eq!(parse_server_frame("not json"), None);
        assert_eq!(parse_server_frame(r#"{"type":"mystery"}"#), None);
        assert_eq!(parse_server_frame(r#"{"type":"new_message","data":{}}"#), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_server_keeps_retrying_with_fixed_delay() {
        // port 9 on localhost refuses connections
        let config = SocketConfig::new("ws://127.0.0.1:9/api/ws", "token", 1);
        let (handle, updates, connected) = spawn_socket(config);

        tokio::time::sleep(RECONNECT_DELAY * 3).await;
        assert!(!*connected.borrow());
        assert!(!handle.is_finished());

        drop(updates);
        handle.abort();
    }
}
