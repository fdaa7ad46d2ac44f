//! Connection Registry - Connessioni WebSocket aperte, indicizzate per utente
//!
//! Ogni socket accettato riceve un [`Connection`] con un canale verso il proprio task di
//! scrittura. Una connessione appartiene al massimo a un utente alla volta; finché non
//! annuncia la propria identità non compare in nessun insieme utente.

use crate::dtos::ServerEvent;
use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, instrument, warn};

pub type ConnectionId = u64;

/// Stato del trasporto di una connessione
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Open => 1,
            ConnectionState::Closed => 2,
        }
    }
}

/// Comandi per il task che possiede il sink del socket
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(Utf8Bytes),
    Ping,
    Close,
}

/// Una connessione WebSocket viva
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    tx: UnboundedSender<Outbound>,
    alive: AtomicBool,
    state: AtomicU8,
    terminated: Notify,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Connecting -> Open. A closed connection never reopens.
    pub fn mark_open(&self) {
        let _ = self.state.compare_exchange(
            ConnectionState::Connecting.as_u8(),
            ConnectionState::Open.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed.as_u8(), Ordering::Release);
    }

    /// Called on every pong
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Writes a pre-serialized frame. Failures are swallowed: a dead transport is reaped by the sweep.
    fn send_frame(&self, frame: Utf8Bytes) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(Outbound::Frame(frame)).is_ok()
    }

    /// Serializes and writes one event to this connection only
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.send_frame(Utf8Bytes::from(json)),
            Err(e) => {
                error!("Failed to serialize {} event: {:?}", event.kind(), e);
                false
            }
        }
    }

    fn ping(&self) {
        if self.is_open() {
            let _ = self.tx.send(Outbound::Ping);
        }
    }

    /// Closes the transport and wakes the reader loop
    pub fn terminate(&self) {
        self.mark_closed();
        let _ = self.tx.send(Outbound::Close);
        self.terminated.notify_one();
    }

    /// Resolves once [`Connection::terminate`] has been called
    pub async fn terminated(&self) {
        self.terminated.notified().await
    }
}

/// Appartenenza delle connessioni agli utenti. Le due mappe cambiano sempre insieme.
#[derive(Debug, Default)]
struct Membership {
    users: HashMap<i32, HashMap<ConnectionId, Arc<Connection>>>,
    owners: HashMap<ConnectionId, i32>,
}

impl Membership {
    fn detach(&mut self, user_id: i32, connection_id: ConnectionId) {
        if let Some(set) = self.users.get_mut(&user_id) {
            set.remove(&connection_id);
            if set.is_empty() {
                self.users.remove(&user_id);
            }
        }
    }

    fn connections_of(&self, user_id: i32) -> Vec<Arc<Connection>> {
        self.users
            .get(&user_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// Registro delle connessioni: utente -> insieme di connessioni aperte
///
/// Un'entry utente esiste se e solo se contiene almeno una connessione non chiusa.
/// Registrazione, rimozione e lettura degli insiemi avvengono sotto un unico lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    // every accepted connection, authenticated or not
    sockets: DashMap<ConnectionId, Arc<Connection>>,
    membership: Mutex<Membership>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // nessuna sezione critica può andare in panic a metà: lo stato resta coerente anche se avvelenato
    fn membership(&self) -> MutexGuard<'_, Membership> {
        self.membership.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Crea una nuova connessione (stato Connecting) e il ricevitore per il task di scrittura
    pub fn accept(&self) -> (Arc<Connection>, UnboundedReceiver<Outbound>) {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let connection = Arc::new(Connection {
            id,
            tx,
            alive: AtomicBool::new(true),
            state: AtomicU8::new(ConnectionState::Connecting.as_u8()),
            terminated: Notify::new(),
        });
        self.sockets.insert(id, connection.clone());
        debug!(connection_id = id, "Connection accepted");
        (connection, rx)
    }

    /// Associa la connessione all'utente. Idempotente; una connessione già associata a un
    /// altro utente viene spostata. Ritorna false se la connessione è già chiusa.
    #[instrument(skip(self, connection), fields(connection_id = connection.id()))]
    pub fn register(&self, user_id: i32, connection: &Arc<Connection>) -> bool {
        let id = connection.id();
        let mut membership = self.membership();

        // unregister marca la connessione Closed prima di prendere il lock
        if connection.state() == ConnectionState::Closed {
            warn!("Connection already closed, not registered");
            return false;
        }

        match membership.owners.insert(id, user_id) {
            Some(previous) if previous == user_id => {
                debug!("Connection already registered");
                return true;
            }
            Some(previous) => {
                info!(previous_user_id = previous, "Connection moved to another user");
                membership.detach(previous, id);
            }
            None => {}
        }

        membership
            .users
            .entry(user_id)
            .or_default()
            .insert(id, connection.clone());

        info!(
            online_users = membership.users.len(),
            "User connection registered"
        );
        true
    }

    /// Rimuove la connessione da ogni insieme. Idempotente, no-op per connessioni mai autenticate.
    /// Ritorna true se la connessione era presente.
    #[instrument(skip(self))]
    pub fn unregister(&self, connection_id: ConnectionId) -> bool {
        let socket = self.sockets.remove(&connection_id);
        if let Some((_, connection)) = &socket {
            connection.mark_closed();
        }

        let mut membership = self.membership();
        if let Some(user_id) = membership.owners.remove(&connection_id) {
            membership.detach(user_id, connection_id);
            debug!(user_id, "Connection unregistered");
        }

        socket.is_some()
    }

    fn connections_of(&self, user_id: i32) -> Vec<Arc<Connection>> {
        self.membership().connections_of(user_id)
    }

    /// Serializza l'evento una volta e lo scrive su ogni connessione aperta dell'utente.
    /// Ritorna il numero di connessioni raggiunte.
    #[instrument(skip(self, event), fields(event = event.kind()))]
    pub fn send_to_user(&self, user_id: i32, event: &ServerEvent) -> usize {
        let connections = self.connections_of(user_id);
        if connections.is_empty() {
            debug!("User not online, event dropped");
            return 0;
        }

        let frame = match serde_json::to_string(event) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                error!("Failed to serialize event: {:?}", e);
                return 0;
            }
        };

        let delivered = connections
            .iter()
            .filter(|connection| connection.send_frame(frame.clone()))
            .count();

        debug!(delivered, total = connections.len(), "Event sent to user");
        delivered
    }

    /// Invia l'evento a tutte le connessioni di tutti gli utenti
    #[instrument(skip(self, event), fields(event = event.kind()))]
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                error!("Failed to serialize event: {:?}", e);
                return 0;
            }
        };

        let connections: Vec<Arc<Connection>> = self
            .membership()
            .users
            .values()
            .flat_map(|set| set.values().cloned())
            .collect();

        let delivered = connections
            .iter()
            .filter(|connection| connection.send_frame(frame.clone()))
            .count();

        info!(delivered, "Event broadcast to all users");
        delivered
    }

    /// Un ciclo di liveness: termina le connessioni che non hanno risposto al ping precedente
    /// e invia un nuovo ping alle altre. Ritorna il numero di connessioni terminate.
    pub fn sweep(&self) -> usize {
        let connections: Vec<Arc<Connection>> =
            self.sockets.iter().map(|entry| entry.value().clone()).collect();

        let mut terminated = 0;
        for connection in connections {
            if !connection.alive.swap(false, Ordering::AcqRel) {
                warn!(connection_id = connection.id(), "No pong since last sweep, terminating");
                connection.terminate();
                self.unregister(connection.id());
                terminated += 1;
            } else {
                connection.ping();
            }
        }

        if terminated > 0 {
            info!(terminated, remaining = self.sockets.len(), "Liveness sweep completed");
        }
        terminated
    }

    /// Chiude ogni connessione e svuota il registro
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        let connections: Vec<Arc<Connection>> =
            self.sockets.iter().map(|entry| entry.value().clone()).collect();
        for connection in &connections {
            connection.terminate();
        }
        self.sockets.clear();
        let mut membership = self.membership();
        membership.owners.clear();
        membership.users.clear();
        info!(closed = connections.len(), "Connection registry shut down");
    }

    pub fn connection_count(&self) -> usize {
        self.sockets.len()
    }

    pub fn online_user_count(&self) -> usize {
        self.membership().users.len()
    }

    pub fn user_connection_count(&self, user_id: i32) -> usize {
        self.membership()
            .users
            .get(&user_id)
            .map(|set| set.len())
            .unwrap_or(0)
    }

    pub fn is_user_online(&self, user_id: i32) -> bool {
        self.membership().users.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection_event() -> ServerEvent {
        ServerEvent::Connection {
            message: "hello".to_string(),
        }
    }

    fn open(registry: &ConnectionRegistry) -> (Arc<Connection>, UnboundedReceiver<Outbound>) {
        let (connection, rx) = registry.accept();
        connection.mark_open();
        (connection, rx)
    }

    fn frames(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_send_to_user_reaches_every_tab_and_nobody_else() {
        let registry = ConnectionRegistry::new();
        let (tab1, mut rx1) = open(&registry);
        let (tab2, mut rx2) = open(&registry);
        let (other, mut rx3) = open(&registry);
        registry.register(1, &tab1);
        registry.register(1, &tab2);
        registry.register(2, &other);

        assert_eq!(registry.send_to_user(1, &connection_event()), 2);

        let expected = Outbound::Frame(Utf8Bytes::from(
            serde_json::to_string(&connection_event()).unwrap(),
        ));
        assert_eq!(frames(&mut rx1), vec![expected.clone()]);
        assert_eq!(frames(&mut rx2), vec![expected]);
        assert!(frames(&mut rx3).is_empty());
    }

    #[test]
    fn test_send_to_offline_user_is_a_noop() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.send_to_user(42, &connection_event()), 0);
        assert_eq!(registry.online_user_count(), 0);
    }

    #[test]
    fn test_connections_not_open_are_skipped() {
        let registry = ConnectionRegistry::new();
        let (connecting, mut rx) = registry.accept();
        registry.register(1, &connecting);

        assert_eq!(registry.send_to_user(1, &connection_event()), 0);
        assert!(frames(&mut rx).is_empty());
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = open(&registry);
        registry.register(1, &connection);
        registry.register(1, &connection);
        assert_eq!(registry.user_connection_count(1), 1);
    }

    #[test]
    fn test_reauth_moves_connection() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = open(&registry);
        registry.register(1, &connection);
        registry.register(2, &connection);

        assert!(!registry.is_user_online(1));
        assert_eq!(registry.user_connection_count(2), 1);
    }

    #[test]
    fn test_unregister_is_idempotent_and_drops_empty_entries() {
        let registry = ConnectionRegistry::new();
        let (tab1, _rx1) = open(&registry);
        let (tab2, _rx2) = open(&registry);
        registry.register(1, &tab1);
        registry.register(1, &tab2);

        assert!(registry.unregister(tab1.id()));
        assert!(registry.is_user_online(1));
        assert!(!registry.unregister(tab1.id()));
        assert_eq!(registry.user_connection_count(1), 1);

        registry.unregister(tab2.id());
        assert!(!registry.is_user_online(1));
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_unregister_unauthenticated_connection() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = open(&registry);
        assert!(registry.unregister(connection.id()));
        assert_eq!(registry.online_user_count(), 0);
    }

    #[test]
    fn test_broadcast_all_reaches_every_user() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = open(&registry);
        let (b, mut rx_b) = open(&registry);
        let (_anonymous, mut rx_anon) = open(&registry);
        registry.register(1, &a);
        registry.register(2, &b);

        assert_eq!(registry.broadcast_all(&connection_event()), 2);
        assert_eq!(frames(&mut rx_a).len(), 1);
        assert_eq!(frames(&mut rx_b).len(), 1);
        assert!(frames(&mut rx_anon).is_empty());
    }

    #[test]
    fn test_sweep_pings_then_terminates_silent_connections() {
        let registry = ConnectionRegistry::new();
        let (responsive, mut rx_ok) = open(&registry);
        let (silent, mut rx_silent) = open(&registry);
        registry.register(1, &responsive);
        registry.register(2, &silent);

        // first cycle: everybody starts alive, everybody gets pinged
        assert_eq!(registry.sweep(), 0);
        assert_eq!(frames(&mut rx_ok), vec![Outbound::Ping]);
        assert_eq!(frames(&mut rx_silent), vec![Outbound::Ping]);

        responsive.mark_alive();

        // second cycle: the silent one is reaped
        assert_eq!(registry.sweep(), 1);
        assert_eq!(frames(&mut rx_ok), vec![Outbound::Ping]);
        assert_eq!(frames(&mut rx_silent), vec![Outbound::Close]);
        assert_eq!(silent.state(), ConnectionState::Closed);
        assert!(!registry.is_user_online(2));
        assert!(registry.is_user_online(1));
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx) = open(&registry);
        registry.register(1, &a);

        registry.shutdown();

        assert_eq!(frames(&mut rx), vec![Outbound::Close]);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.online_user_count(), 0);
        assert_eq!(registry.send_to_user(1, &connection_event()), 0);
    }

    #[test]
    fn test_closed_connection_is_not_registered() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = open(&registry);
        registry.unregister(connection.id());

        assert!(!registry.register(1, &connection));
        assert!(!registry.is_user_online(1));
    }

    #[test]
    fn test_concurrent_register_and_unregister_never_leak() {
        use std::sync::Barrier;
        use std::thread;

        let registry = Arc::new(ConnectionRegistry::new());
        for _ in 0..2_000 {
            let (connection, _rx) = open(&registry);
            let barrier = Arc::new(Barrier::new(2));

            let reader = {
                let (registry, connection, barrier) =
                    (registry.clone(), connection.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    registry.register(7, &connection);
                })
            };
            let sweeper = {
                let (registry, id, barrier) = (registry.clone(), connection.id(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    registry.unregister(id);
                })
            };
            reader.join().unwrap();
            sweeper.join().unwrap();

            // in entrambi gli ordini la connessione chiusa non resta associata all'utente
            assert_eq!(connection.state(), ConnectionState::Closed);
            assert!(!registry.is_user_online(7), "Closed connection left registered");
        }
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_terminate_wakes_reader() {
        let registry = ConnectionRegistry::new();
        let (connection, _rx) = open(&registry);
        connection.terminate();
        // the stored permit resolves immediately
        connection.terminated().await;
        assert!(!connection.is_open());
    }
}
