//! Portal library - server real-time del portale clienti e client di chat
//!
//! Espone i moduli principali per il binario e per i test.

pub mod client;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get, patch, post},
};
use services::uploads::MAX_CHAT_ATTACHMENT_BYTES;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Margine per il campo testo e gli header multipart oltre al limite dell'allegato
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/auth", configure_auth_routes())
        .nest("/projects", configure_project_routes(state.clone()))
        .nest("/chat", configure_chat_routes(state.clone()))
        .route(
            "/ws",
            any(ws::ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                core::authentication_middleware,
            )),
        );

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Configura le routes di autenticazione (login, register)
fn configure_auth_routes() -> Router<Arc<AppState>> {
    use services::*;
    Router::new()
        .route("/login", post(login_user))
        .route("/register", post(register_user))
}

/// Configura le routes per progetti, task e chat di progetto
fn configure_project_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{authentication_middleware, project_access_middleware};
    use services::*;

    // Rotte che NON richiedono accesso a un progetto (solo autenticazione)
    let public_routes = Router::new()
        .route("/", get(list_projects).post(create_project))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ));

    // Rotte sul singolo progetto (autenticazione + proprietario o admin)
    let project_routes = Router::new()
        .route("/{project_id}", get(get_project).patch(update_project))
        .route("/{project_id}/tasks", get(list_tasks).post(create_task))
        .route("/{project_id}/tasks/{task_id}", patch(update_task))
        .route(
            "/{project_id}/chat/{recipient_id}",
            get(get_project_conversation).post(send_project_message),
        )
        .layer(DefaultBodyLimit::max(
            MAX_CHAT_ATTACHMENT_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            project_access_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(project_routes)
}

/// Configura le routes della chat diretta, lettura e contatore dei non letti
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route(
            "/direct/{recipient_id}",
            get(get_direct_conversation).post(send_direct_message),
        )
        .route("/messages/{message_id}/read", patch(mark_message_read))
        .route("/unread", get(unread_count))
        .layer(DefaultBodyLimit::max(
            MAX_CHAT_ATTACHMENT_BYTES + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
