//! Session — one live bidirectional connection to one device (spec §4.6, §5).
//!
//! Transport-agnostic: the caller (sync-server's WebSocket handler)
//! bridges the actual socket to `inbound`/`outbound` raw-text channels;
//! `Session::run` owns the state machine, heartbeat, hub registration,
//! and dispatch to the [`SyncService`] from there.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use crate::models::SyncEvent;
use crate::realtime::hub::ConnectionHub;
use crate::realtime::protocol::WireMessage;
use crate::sync::{SyncMessage, SyncService};

/// Per-session lifecycle state (spec §4.6's state table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Active,
    Draining,
    Closed,
}

/// Configuration governing heartbeat cadence.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub ping_interval: StdDuration,
    pub pong_timeout: StdDuration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: StdDuration::from_secs(30),
            pong_timeout: StdDuration::from_secs(60),
        }
    }
}

/// One bidirectional session. Constructed already Active: the caller
/// completes the Opening handshake (principal authentication) before
/// calling [`Session::run`].
pub struct Session {
    pub user_id: String,
    pub device_id: String,
    service: Arc<SyncService>,
    hub: Arc<ConnectionHub>,
    heartbeat: HeartbeatConfig,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        service: Arc<SyncService>,
        hub: Arc<ConnectionHub>,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
            service,
            hub,
            heartbeat,
        }
    }

    /// Drive the session to completion. `inbound` yields raw text
    /// frames read from the socket; `socket_out` is where outbound raw
    /// text frames are written. Returns once the session reaches
    /// Closed, either because the peer/socket closed or the heartbeat
    /// timed out.
    pub async fn run(self, mut inbound: mpsc::Receiver<String>, socket_out: mpsc::Sender<String>) {
        let (bus_tx, mut bus_rx) = mpsc::channel::<SyncEvent>(64);
        self.hub.register(&self.user_id, &self.device_id, bus_tx).await;
        info!(user_id = %self.user_id, device_id = %self.device_id, "session active");

        let mut state = SessionState::Active;
        let mut ping_ticker = interval(self.heartbeat.ping_interval);
        let mut awaiting_pong = false;
        // Armed only between sending a ping and receiving its pong; a
        // far-future sleep here is inert until `reset` pulls it in.
        let pong_deadline = sleep(Duration::from_secs(u64::MAX / 2));
        tokio::pin!(pong_deadline);

        'session: while state == SessionState::Active {
            tokio::select! {
                _ = ping_ticker.tick(), if !awaiting_pong => {
                    let ping = WireMessage::Ping { timestamp: Utc::now() };
                    if self.send_wire(&socket_out, ping).await.is_err() {
                        state = SessionState::Closed;
                        break 'session;
                    }
                    awaiting_pong = true;
                    pong_deadline.as_mut().reset(tokio::time::Instant::now() + self.heartbeat.pong_timeout);
                }

                () = &mut pong_deadline, if awaiting_pong => {
                    warn!(user_id = %self.user_id, device_id = %self.device_id, "pong timeout, closing session");
                    state = SessionState::Closed;
                    break 'session;
                }

                frame = inbound.recv() => {
                    match frame {
                        Some(raw) => {
                            if self.handle_inbound(&raw, &socket_out, &mut awaiting_pong).await.is_err() {
                                state = SessionState::Closed;
                                break 'session;
                            }
                        }
                        None => {
                            debug!(user_id = %self.user_id, device_id = %self.device_id, "inbound closed");
                            state = SessionState::Draining;
                            break 'session;
                        }
                    }
                }

                bus_event = bus_rx.recv() => {
                    match bus_event {
                        Some(event) => {
                            let wire = WireMessage::from_sync_message(
                                SyncMessage::SyncEvent { event },
                                &self.device_id,
                            );
                            if self.send_wire(&socket_out, wire).await.is_err() {
                                state = SessionState::Closed;
                                break 'session;
                            }
                        }
                        None => {
                            // Hub dropped the sender; nothing more to deliver.
                        }
                    }
                }
            }
        }

        if state == SessionState::Draining {
            // Flush nothing further is owed to the socket; close cleanly.
            state = SessionState::Closed;
        }

        self.hub.unregister(&self.user_id, &self.device_id).await;
        debug_assert_eq!(state, SessionState::Closed);
        info!(user_id = %self.user_id, device_id = %self.device_id, "session closed");
    }

    /// Dispatches one inbound frame. Clears `awaiting_pong` on a
    /// received `Pong`. Returns `Err` only when the outbound socket
    /// itself is gone — protocol-level errors are reported to the peer
    /// as a wire `Error` frame, not treated as session failure.
    async fn handle_inbound(
        &self,
        raw: &str,
        socket_out: &mpsc::Sender<String>,
        awaiting_pong: &mut bool,
    ) -> Result<(), ()> {
        let parsed = match WireMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => return self.report_error(socket_out, e).await,
        };

        if matches!(parsed, WireMessage::Pong { .. }) {
            *awaiting_pong = false;
            return Ok(());
        }

        let service_msg = match parsed.into_sync_message(&self.user_id, &self.device_id) {
            Ok(msg) => msg,
            Err(e) => return self.report_error(socket_out, e).await,
        };

        match self.service.handle_sync_message(&self.user_id, service_msg).await {
            Ok(response) => {
                let wire = WireMessage::from_sync_message(response, &self.device_id);
                self.send_wire(socket_out, wire).await
            }
            Err(e) => self.report_error(socket_out, e).await,
        }
    }

    async fn report_error(&self, socket_out: &mpsc::Sender<String>, e: crate::error::Error) -> Result<(), ()> {
        self.send_wire(
            socket_out,
            WireMessage::Error {
                data: crate::realtime::protocol::ErrorData {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
            },
        )
        .await
    }

    async fn send_wire(&self, socket_out: &mpsc::Sender<String>, msg: WireMessage) -> Result<(), ()> {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(_) => return Err(()),
        };
        socket_out.send(json).await.map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InProcessBus;
    use crate::store::{SqliteEventStore, SqliteSyncStateStore};

    async fn test_session() -> (Session, Arc<ConnectionHub>) {
        let events = Arc::new(SqliteEventStore::in_memory().await.unwrap());
        let states = Arc::new(SqliteSyncStateStore::in_memory().await.unwrap());
        let bus = Arc::new(InProcessBus::new(16));
        let service = Arc::new(SyncService::new(events, states, bus.clone()));
        let hub = Arc::new(ConnectionHub::new(bus));

        let session = Session::new(
            "u1",
            "d1",
            service,
            hub.clone(),
            HeartbeatConfig {
                ping_interval: StdDuration::from_millis(20),
                pong_timeout: StdDuration::from_millis(40),
            },
        );
        (session, hub)
    }

    #[tokio::test]
    async fn session_registers_and_unregisters_on_inbound_close() {
        let (session, hub) = test_session().await;
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (outbound_tx, _outbound_rx) = mpsc::channel(4);

        drop(inbound_tx);
        session.run(inbound_rx, outbound_tx).await;

        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn session_responds_to_sync_request() {
        let (session, _hub) = test_session().await;
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);

        let request = serde_json::json!({
            "type": "sync_request",
            "user_id": "u1",
            "device_id": "d1",
            "data": { "last_sync_time": null }
        });
        inbound_tx.send(request.to_string()).await.unwrap();
        drop(inbound_tx);

        session.run(inbound_rx, outbound_tx).await;

        let mut saw_response = false;
        while let Ok(frame) = outbound_rx.try_recv() {
            if frame.contains("sync_response") {
                saw_response = true;
            }
        }
        assert!(saw_response);
    }
}
