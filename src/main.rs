use portal::core::Config;
use portal::dtos::ServerEvent;
use portal::services::ensure_admin;
use portal::ws::spawn_heartbeat;
use portal::{AppState, create_router};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal=debug,tower_http=info".into()),
        )
        .with_target(false)
        .init();

    // Inizializza la configurazione
    let config = Config::from_env()?;
    config.print_info();

    // Pool SQLite e migrazioni
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready");

    let state = Arc::new(AppState::new(
        pool,
        config.jwt_secret.clone(),
        config.upload_dir.clone(),
    ));

    // Amministratore iniziale, se configurato
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if let Err(e) = ensure_admin(&state, username, password).await {
            error!("Admin bootstrap failed: {:?}", e);
        }
    }

    // Sweep di liveness delle connessioni
    let heartbeat = spawn_heartbeat(state.connections.clone(), config.heartbeat_interval());

    // Crea il router
    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    let registry = state.connections.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // avviso a tutti i client, poi chiusura dei socket
            registry.broadcast_all(&ServerEvent::Connection {
                message: "Server is shutting down".to_string(),
            });
            registry.shutdown();
        })
        .await?;

    heartbeat.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {:?}", e);
            std::future::pending::<()>().await
        }
    }
}
