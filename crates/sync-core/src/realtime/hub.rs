//! Connection Hub — in-process registry of active Sessions (spec §4.6).
//!
//! Keyed by `(user_id, device_id)`. Subscribes to the Bus on behalf of
//! its sessions and fans bus deliveries out to every session for that
//! user, leaving device-exclusion to the session itself (a session
//! never forwards an event whose `device_id` is its own).

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::bus::Bus;
use crate::models::SyncEvent;

type SessionKey = (String, String);
type SessionMap = Arc<RwLock<HashMap<SessionKey, mpsc::Sender<SyncEvent>>>>;

/// Registry of live sessions plus the per-user bus fan-out tasks.
pub struct ConnectionHub {
    bus: Arc<dyn Bus>,
    sessions: SessionMap,
    subscriptions: RwLock<HashMap<String, JoinHandle<()>>>,
}

impl ConnectionHub {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self {
            bus,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly Active session's outbound channel. Starts the
    /// user's bus subscription task if this is the first session for
    /// that user in this process.
    pub async fn register(&self, user_id: &str, device_id: &str, outbound: mpsc::Sender<SyncEvent>) {
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert((user_id.to_string(), device_id.to_string()), outbound);
        }
        self.ensure_subscription(user_id).await;
    }

    /// Remove a Closed session. Stops the user's bus subscription task
    /// if it was the last session for that user in this process.
    pub async fn unregister(&self, user_id: &str, device_id: &str) {
        let any_left_for_user = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&(user_id.to_string(), device_id.to_string()));
            sessions.keys().any(|(u, _)| u == user_id)
        };

        if !any_left_for_user {
            if let Some(handle) = self.subscriptions.write().await.remove(user_id) {
                handle.abort();
            }
        }
    }

    /// Number of sessions currently registered (diagnostic use only).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn ensure_subscription(&self, user_id: &str) {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(user_id) {
            return;
        }

        let stream = match self.bus.subscribe(user_id).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, user_id, "failed to subscribe hub to bus channel");
                return;
            }
        };

        let sessions = self.sessions.clone();
        let user_id_owned = user_id.to_string();
        let handle = tokio::spawn(fan_out(user_id_owned, stream, sessions));
        subscriptions.insert(user_id.to_string(), handle);
    }
}

/// Delivers every event the Bus publishes for `user_id` to each
/// registered session of that user, except the originating device.
async fn fan_out(user_id: String, mut stream: crate::bus::EventStream, sessions: SessionMap) {
    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, user_id, "bus stream error in hub fan-out");
                continue;
            }
        };

        let recipients: Vec<mpsc::Sender<SyncEvent>> = {
            let sessions = sessions.read().await;
            sessions
                .iter()
                .filter(|((u, device_id), _)| u == &user_id && device_id != &event.device_id)
                .map(|(_, tx)| tx.clone())
                .collect()
        };

        for tx in recipients {
            let _ = tx.send(event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InProcessBus;
    use crate::models::{SyncAction, SyncEventType};

    fn sample_event(user_id: &str, device_id: &str) -> SyncEvent {
        SyncEvent::new(
            SyncEventType::BookmarkCreated,
            user_id,
            "b1",
            SyncAction::Create,
            "{}",
            device_id,
        )
    }

    #[tokio::test]
    async fn register_and_unregister_tracks_session_count() {
        let hub = ConnectionHub::new(Arc::new(InProcessBus::new(16)));
        let (tx, _rx) = mpsc::channel(4);
        hub.register("u1", "d1", tx).await;
        assert_eq!(hub.session_count().await, 1);

        hub.unregister("u1", "d1").await;
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn bus_delivery_excludes_originating_device() {
        let bus = Arc::new(InProcessBus::new(16));
        let hub = ConnectionHub::new(bus.clone());

        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        hub.register("u1", "d1", tx1).await;
        hub.register("u1", "d2", tx2).await;

        bus.publish("u1", sample_event("u1", "d1")).await.unwrap();

        let received = rx2.recv().await.unwrap();
        assert_eq!(received.device_id, "d1");
        assert!(rx1.try_recv().is_err());
    }
}
