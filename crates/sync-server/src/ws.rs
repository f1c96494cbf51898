//! WebSocket upgrade handler (spec §6.1) — bridges an axum `WebSocket`
//! into a transport-agnostic [`sync_core::realtime::Session`].

use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use sync_core::realtime::{HeartbeatConfig, Session};
use tokio::sync::mpsc;

use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub device_id: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub, query.device_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String, device_id: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(32);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(32);

    // Drains text frames off the real socket into the Session's inbound queue.
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    if inbound_tx.send(text).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Writes whatever the Session produces back onto the real socket.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let heartbeat = HeartbeatConfig {
        ping_interval: Duration::from_secs(state.config.bus.heartbeat_interval_secs),
        pong_timeout: Duration::from_secs(state.config.bus.pong_timeout_secs),
    };
    let session = Session::new(
        user_id,
        device_id,
        state.sync_service.clone(),
        state.hub.clone(),
        heartbeat,
    );
    session.run(inbound_rx, outbound_tx).await;

    reader.abort();
    writer.abort();
}
