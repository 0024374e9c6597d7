// handlers.rs

use crate::{
    metrics,
    models::{AppState, BusMessage, StatePayload},
    utils,
};
use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::SplitSink,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn handle_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    // The slot is held from here on, so concurrent upgrades cannot overshoot the limit.
    let Some(client_id) = state.reserve_client() else {
        warn!(max = state.max_connections, "Refusing bus client, connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many bus connections").into_response();
    };
    metrics::set_bus_clients(state.client_count());
    info!(%client_id, "Bus client connection attempt");

    let failed = Arc::clone(&state);
    ws.on_failed_upgrade(move |e| {
        warn!(%client_id, "Bus client upgrade failed: {}", e);
        failed.release_client(client_id);
        metrics::set_bus_clients(failed.client_count());
    })
    .on_upgrade(move |socket| handle_client(socket, state, client_id))
}

/// Current lamp state, as last published on the state topic.
#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "Current lamp state", body = StatePayload))
)]
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StatePayload> {
    Json(state.latest.borrow().clone())
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &BusMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}

async fn handle_client(socket: WebSocket, state: Arc<AppState>, client_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    info!(%client_id, "Bus client connected");

    // Subscribe before taking the snapshot so no publish falls in between.
    let mut rx = state.bus.subscribe();
    let current = state.latest.borrow().clone();
    let state_topic = state.topics.state.clone();

    let send_task = tokio::spawn(async move {
        match current.to_json() {
            Ok(payload) => {
                if send_message(&mut sender, &BusMessage::new(state_topic, payload))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => error!("Failed to encode state: {}", e),
        }

        loop {
            match rx.recv().await {
                Ok(message) => {
                    if send_message(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%client_id, skipped, "Bus client lagging behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let recv_task = tokio::spawn({
        let state = Arc::clone(&state);
        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<BusMessage>(text.as_str()) {
                            Ok(message) => {
                                if state.bus.deliver(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(%client_id, "Invalid bus envelope: {}", e),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::pin!(send_task, recv_task);
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    utils::cleanup_client_connection(client_id, &state).await;
}
