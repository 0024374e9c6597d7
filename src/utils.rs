// utils.rs
use super::models::AppState;
use chrono::Utc;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use crate::metrics;

pub async fn cleanup_client_connection(client_id: Uuid, state: &AppState) {
    if let Some(entry) = state.release_client(client_id) {
        let connected_for = Utc::now() - entry.connected_at;
        info!(
            "Bus client {} disconnected after {}s",
            client_id,
            connected_for.num_seconds()
        );
    }
    metrics::set_bus_clients(state.client_count());
}

/// Resolves once `true` has been sent on `shutdown`, or its sender is gone.
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
