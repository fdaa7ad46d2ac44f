//! Heartbeat - Sweep periodico di liveness sulle connessioni

use crate::ws::ConnectionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Intervallo di default tra due ping
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Avvia il task che ad ogni periodo termina le connessioni silenziose e pinga le altre.
/// Il task vive finché il chiamante non fa `abort` sull'handle.
pub fn spawn_heartbeat(registry: Arc<ConnectionRegistry>, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Heartbeat started");
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let terminated = registry.sweep();
            debug!(
                terminated,
                connections = registry.connection_count(),
                "Heartbeat tick"
            );
        }
    })
}
