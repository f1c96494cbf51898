//! Bus — user-scoped publish/subscribe fabric (spec §4.6, §6.4).
//!
//! The core depends only on the capability set `{ publish, subscribe }`
//! (spec §9); [`InProcessBus`] is the in-process multicast substrate
//! used for tests and single-instance deployments. A production
//! deployment fronted by a shared pub/sub broker implements the same
//! trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::models::SyncEvent;

/// A cancellable stream of events published for one `user_id`.
pub type EventStream = std::pin::Pin<Box<dyn Stream<Item = Result<SyncEvent>> + Send>>;

/// Capability set the Sync Service and Connection Hub depend on.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Fan out `event` to every subscriber of `event.user_id`.
    async fn publish(&self, user_id: &str, event: SyncEvent) -> Result<()>;

    /// Subscribe to every future publication for `user_id`.
    async fn subscribe(&self, user_id: &str) -> Result<EventStream>;
}

/// In-process Bus backed by one `tokio::sync::broadcast` channel per
/// `user_id`. Channels are created lazily and kept for the process
/// lifetime (spec §6.4: "one channel per `user_id`").
pub struct InProcessBus {
    channels: RwLock<HashMap<String, broadcast::Sender<SyncEvent>>>,
    capacity: usize,
}

impl InProcessBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    async fn sender_for(&self, user_id: &str) -> broadcast::Sender<SyncEvent> {
        if let Some(sender) = self.channels.read().await.get(user_id) {
            return sender.clone();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Bus for InProcessBus {
    async fn publish(&self, user_id: &str, event: SyncEvent) -> Result<()> {
        let sender = self.sender_for(user_id).await;
        // No active subscriber is not an error: the event is already
        // durable in the Event Store (spec §7's resilience decision).
        let _ = sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<EventStream> {
        let receiver = self.sender_for(user_id).await.subscribe();
        let stream = BroadcastStream::new(receiver)
            .map(|item| item.map_err(|e| Error::BusUnavailable(format!("lagged subscriber: {e}"))));
        Ok(Box::pin(stream))
    }
}

/// Shared handle alias used throughout the crate and by sync-server.
pub type SharedBus = Arc<dyn Bus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncAction, SyncEventType};

    fn sample_event(user_id: &str) -> SyncEvent {
        SyncEvent::new(
            SyncEventType::BookmarkCreated,
            user_id,
            "b1",
            SyncAction::Create,
            "{}",
            "d1",
        )
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = InProcessBus::new(16);
        let mut rx1 = bus.subscribe("u1").await.unwrap();
        let mut rx2 = bus.subscribe("u1").await.unwrap();

        bus.publish("u1", sample_event("u1")).await.unwrap();

        let e1 = rx1.next().await.unwrap().unwrap();
        let e2 = rx2.next().await.unwrap().unwrap();
        assert_eq!(e1.resource_id, "b1");
        assert_eq!(e2.resource_id, "b1");
    }

    #[tokio::test]
    async fn publish_is_scoped_to_user() {
        let bus = InProcessBus::new(16);
        let mut rx = bus.subscribe("u2").await.unwrap();

        bus.publish("u1", sample_event("u1")).await.unwrap();
        bus.publish("u2", sample_event("u2")).await.unwrap();

        let received = rx.next().await.unwrap().unwrap();
        assert_eq!(received.user_id, "u2");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let bus = InProcessBus::new(16);
        bus.publish("u1", sample_event("u1")).await.unwrap();
    }
}
