//! Sync Service — the orchestrator exposed to the Request Surface (spec §4.7).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::Bus;
use crate::error::{Error, Result};
use crate::models::{DeltaSync, SyncEvent, SyncState};
use crate::store::{EventStore, SyncStateStore};
use crate::sync::{conflict, optimize};

/// Inbound/outbound message shape for [`SyncService::handle_sync_message`]
/// (spec §6.1's socket protocol, used identically by the HTTP surface's
/// `/sync/events` for the `sync_event` case).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    Ping {
        timestamp: DateTime<Utc>,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    SyncRequest {
        user_id: String,
        device_id: String,
        last_sync_time: Option<DateTime<Utc>>,
    },
    SyncResponse {
        events: Vec<SyncEvent>,
        timestamp: DateTime<Utc>,
    },
    SyncEvent {
        event: SyncEvent,
    },
    Error {
        code: u16,
        message: String,
    },
}

/// Coordinates the Event Store, Sync-State Store, and Bus. Stateless
/// beyond its store/bus handles — safe to share across tasks (spec §5).
pub struct SyncService {
    events: Arc<dyn EventStore>,
    states: Arc<dyn SyncStateStore>,
    bus: Arc<dyn Bus>,
}

impl SyncService {
    pub fn new(events: Arc<dyn EventStore>, states: Arc<dyn SyncStateStore>, bus: Arc<dyn Bus>) -> Self {
        Self { events, states, bus }
    }

    fn require_device_id(device_id: &str) -> Result<()> {
        if device_id.trim().is_empty() {
            return Err(Error::InvalidDevice("device_id must not be empty".into()));
        }
        Ok(())
    }

    /// §4.7 `get_sync_state`.
    pub async fn get_sync_state(&self, user_id: &str, device_id: &str) -> Result<SyncState> {
        Self::require_device_id(device_id)?;
        self.states.get_or_create(user_id, device_id).await
    }

    /// §4.7 `update_sync_state`.
    pub async fn update_sync_state(
        &self,
        user_id: &str,
        device_id: &str,
        last_sync_time: DateTime<Utc>,
    ) -> Result<SyncState> {
        Self::require_device_id(device_id)?;
        if last_sync_time == DateTime::<Utc>::UNIX_EPOCH {
            return Err(Error::InvalidTimestamp(
                "last_sync_time must not be zero".into(),
            ));
        }
        self.states.update(user_id, device_id, last_sync_time).await
    }

    /// §4.7 `get_delta_sync`. Defaults `last_sync_time` to 24 hours ago
    /// when omitted.
    pub async fn get_delta_sync(
        &self,
        user_id: &str,
        device_id: &str,
        last_sync_time: Option<DateTime<Utc>>,
    ) -> Result<DeltaSync> {
        Self::require_device_id(device_id)?;
        let since = last_sync_time.unwrap_or_else(|| Utc::now() - Duration::hours(24));

        let raw = self.events.query_delta(user_id, device_id, since).await?;
        let events = optimize::optimize(raw);

        Ok(DeltaSync {
            events,
            timestamp: Utc::now(),
        })
    }

    /// §4.7 `create_sync_event`. Publication failure is logged and
    /// swallowed — the event is durable and reaches other devices via
    /// their next delta pull (spec §7's resilience decision).
    pub async fn create_sync_event(&self, event: SyncEvent) -> Result<SyncEvent> {
        let user_id = event.user_id.clone();
        let stored = self.events.append(event).await?;

        if let Err(e) = self.bus.publish(&user_id, stored.clone()).await {
            warn!(error = %e, user_id = %user_id, "bus publish failed, relying on pull-based delta sync");
        }

        Ok(stored)
    }

    /// §4.7 `resolve_conflict`.
    pub fn resolve_conflict(&self, events: &[SyncEvent]) -> Option<SyncEvent> {
        conflict::resolve(events).cloned()
    }

    /// §4.5 `queue_offline`. Forces `status = pending`.
    pub async fn queue_offline(&self, mut event: SyncEvent) -> Result<SyncEvent> {
        event.status = crate::models::SyncStatus::Pending;
        self.events.append(event).await
    }

    /// §4.5 read-only view of the offline queue.
    pub async fn get_offline_queue(&self, user_id: &str, device_id: &str) -> Result<Vec<SyncEvent>> {
        Self::require_device_id(device_id)?;
        self.events.query_offline(user_id, device_id).await
    }

    /// §4.5 `process_offline`. Re-entrant-safe: the atomic
    /// `pending -> synced` transition in `mark_status` acts as the
    /// per-event claim (spec §5).
    pub async fn process_offline(&self, user_id: &str, device_id: &str) -> Result<()> {
        Self::require_device_id(device_id)?;
        let pending = self.events.query_offline(user_id, device_id).await?;

        for event in pending {
            if let Err(e) = self.bus.publish(user_id, event.clone()).await {
                warn!(error = %e, event_id = event.id, "offline replay publish failed, leaving event pending");
                continue;
            }

            if let Err(e) = self
                .events
                .mark_status(event.id, crate::models::SyncStatus::Synced)
                .await
            {
                debug!(error = %e, event_id = event.id, "status transition lost the race, likely already claimed");
            }
        }

        Ok(())
    }

    /// Sweeps every `(user_id, device_id)` with at least one pending
    /// event and replays it. Used by the background offline-replay job
    /// so queued mutations eventually reach the Bus even if the
    /// originating device never calls `process_offline` itself (e.g. it
    /// reconnected under a different session in another process).
    pub async fn sweep_offline(&self) -> Result<()> {
        for (user_id, device_id) in self.events.list_pending_devices().await? {
            self.process_offline(&user_id, &device_id).await?;
        }
        Ok(())
    }

    /// §4.7 `optimize_events`, exposed directly for tests and for
    /// callers who already hold a batch of events.
    pub fn optimize_events(&self, events: Vec<SyncEvent>) -> Vec<SyncEvent> {
        optimize::optimize(events)
    }

    /// §4.7 `handle_sync_message` — the dispatcher used by Sessions.
    pub async fn handle_sync_message(&self, user_id: &str, msg: SyncMessage) -> Result<SyncMessage> {
        match msg {
            SyncMessage::Ping { .. } => Ok(SyncMessage::Pong {
                timestamp: Utc::now(),
            }),
            SyncMessage::SyncRequest {
                device_id,
                last_sync_time,
                ..
            } => {
                let delta = self.get_delta_sync(user_id, &device_id, last_sync_time).await?;
                let now = delta.timestamp;

                if let Err(e) = self.update_sync_state(user_id, &device_id, now).await {
                    warn!(error = %e, device_id = %device_id, "failed to advance sync-state cursor after delta");
                }

                Ok(SyncMessage::SyncResponse {
                    events: delta.events,
                    timestamp: delta.timestamp,
                })
            }
            SyncMessage::SyncEvent { event } => {
                let stored = self.create_sync_event(event).await?;
                Ok(SyncMessage::SyncEvent { event: stored })
            }
            SyncMessage::Pong { .. } | SyncMessage::SyncResponse { .. } | SyncMessage::Error { .. } => {
                Err(Error::UnknownMessageType(
                    "message type is not dispatchable by the server".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InProcessBus;
    use crate::models::{SyncAction, SyncEventType};
    use crate::store::{SqliteEventStore, SqliteSyncStateStore};

    async fn service() -> SyncService {
        let events = Arc::new(SqliteEventStore::in_memory().await.unwrap());
        let states = Arc::new(SqliteSyncStateStore::in_memory().await.unwrap());
        let bus = Arc::new(InProcessBus::new(16));
        SyncService::new(events, states, bus)
    }

    fn event(user_id: &str, resource_id: &str, device_id: &str) -> SyncEvent {
        SyncEvent::new(
            SyncEventType::BookmarkCreated,
            user_id,
            resource_id,
            SyncAction::Create,
            "{\"title\":\"a\"}",
            device_id,
        )
    }

    #[tokio::test]
    async fn create_and_fan_out_reaches_other_devices() {
        let svc = service().await;
        svc.create_sync_event(event("u1", "b1", "d1")).await.unwrap();

        let delta = svc.get_delta_sync("u1", "d2", None).await.unwrap();
        assert_eq!(delta.events.len(), 1);
        assert_eq!(delta.events[0].device_id, "d1");
    }

    #[tokio::test]
    async fn device_exclusion_hides_own_events() {
        let svc = service().await;
        svc.create_sync_event(event("u1", "b1", "d1")).await.unwrap();

        let delta = svc.get_delta_sync("u1", "d1", None).await.unwrap();
        assert!(delta.events.is_empty());
    }

    #[tokio::test]
    async fn offline_replay_transitions_pending_to_synced_idempotently() {
        let svc = service().await;
        let e1 = svc.queue_offline(event("u1", "b1", "d1")).await.unwrap();
        let e2 = svc.queue_offline(event("u1", "b2", "d1")).await.unwrap();

        svc.process_offline("u1", "d1").await.unwrap();
        svc.process_offline("u1", "d1").await.unwrap();

        let remaining = svc.get_offline_queue("u1", "d1").await.unwrap();
        assert!(remaining.is_empty());
        assert_ne!(e1.id, e2.id);
    }

    #[tokio::test]
    async fn handle_sync_message_ping_returns_pong() {
        let svc = service().await;
        let response = svc
            .handle_sync_message("u1", SyncMessage::Ping { timestamp: Utc::now() })
            .await
            .unwrap();
        assert!(matches!(response, SyncMessage::Pong { .. }));
    }

    #[tokio::test]
    async fn handle_sync_message_sync_request_returns_delta() {
        let svc = service().await;
        svc.create_sync_event(event("u1", "b1", "d1")).await.unwrap();

        let response = svc
            .handle_sync_message(
                "u1",
                SyncMessage::SyncRequest {
                    user_id: "u1".into(),
                    device_id: "d2".into(),
                    last_sync_time: None,
                },
            )
            .await
            .unwrap();

        match response {
            SyncMessage::SyncResponse { events, .. } => assert_eq!(events.len(), 1),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sweep_offline_drains_every_pending_device() {
        let svc = service().await;
        svc.queue_offline(event("u1", "b1", "d1")).await.unwrap();
        svc.queue_offline(event("u2", "b2", "d2")).await.unwrap();

        svc.sweep_offline().await.unwrap();

        assert!(svc.get_offline_queue("u1", "d1").await.unwrap().is_empty());
        assert!(svc.get_offline_queue("u2", "d2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_sync_state_defaults_device_id_validation() {
        let svc = service().await;
        let err = svc.get_sync_state("u1", "").await.unwrap_err();
        assert!(matches!(err, Error::InvalidDevice(_)));
    }
}
