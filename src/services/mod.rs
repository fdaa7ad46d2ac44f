//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod auth;
pub mod chat;
pub mod project;
pub mod task;
pub mod uploads;

// Re-exports per facilitare l'import
pub use auth::{ensure_admin, login_user, register_user};
pub use chat::{
    get_direct_conversation, get_project_conversation, mark_message_read, send_direct_message,
    send_project_message, unread_count,
};
pub use project::{create_project, get_project, list_projects, update_project};
pub use task::{create_task, list_tasks, update_task};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!(
            "Server is running! {} open connections",
            state.connections.connection_count()
        ),
    )
}
