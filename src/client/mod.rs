//! Client module - Chat Relevance Client
//!
//! Controparte client del canale real-time: riceve gli eventi dal socket, decide se un
//! nuovo messaggio riguarda la conversazione aperta, mantiene lo stato della sessione di
//! chat e parla con le API HTTP della chat.

pub mod api;
pub mod chat;
pub mod error;
pub mod relevance;
pub mod session;
pub mod socket;

pub use api::{ChatBackend, OutgoingAttachment, PortalApi};
pub use chat::{ChatClient, READ_RECEIPT_DELAY};
pub use error::ClientError;
pub use relevance::{ChatAction, ChatView, Toast, is_relevant, react};
pub use session::ChatSession;
pub use socket::{RECONNECT_DELAY, SocketConfig, SocketUpdate, parse_server_frame, spawn_socket};
