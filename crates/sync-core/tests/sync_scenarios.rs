//! Cross-module integration tests
//!
//! Each unit already has its own `#[cfg(test)]` module covering
//! component-local behavior; these tests exercise the end-to-end
//! scenarios of the sync engine's testable properties, wiring the
//! real SQLite-backed stores, the in-process bus, and `SyncService`
//! together the way `sync-server`'s `AppState` does.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use sync_core::bus::{Bus, InProcessBus};
use sync_core::models::{SyncAction, SyncEvent, SyncEventType, SyncStatus};
use sync_core::store::{SqliteEventStore, SqliteSyncStateStore};
use sync_core::sync::SyncService;

async fn test_service() -> SyncService {
    let events = Arc::new(SqliteEventStore::in_memory().await.unwrap());
    let states = Arc::new(SqliteSyncStateStore::in_memory().await.unwrap());
    let bus = Arc::new(InProcessBus::new(32));
    SyncService::new(events, states, bus)
}

fn bookmark_event(user_id: &str, resource_id: &str, device_id: &str, data: &str) -> SyncEvent {
    SyncEvent::new(
        SyncEventType::BookmarkCreated,
        user_id,
        resource_id,
        SyncAction::Create,
        data,
        device_id,
    )
}

/// Scenario 1 — create and fan-out.
#[tokio::test]
async fn create_and_fan_out() {
    let svc = test_service().await;
    svc.create_sync_event(bookmark_event("u1", "B1", "D1", "{\"title\":\"a\"}"))
        .await
        .unwrap();

    let delta = svc.get_delta_sync("u1", "D2", Some(DateTime::<Utc>::UNIX_EPOCH)).await.unwrap();
    assert_eq!(delta.events.len(), 1);
    assert_eq!(delta.events[0].resource_id, "B1");
    assert_eq!(delta.events[0].device_id, "D1");
}

/// Scenario 2 — device exclusion.
#[tokio::test]
async fn device_exclusion_hides_originating_device() {
    let svc = test_service().await;
    svc.create_sync_event(bookmark_event("u1", "B1", "D1", "{}"))
        .await
        .unwrap();

    let delta = svc.get_delta_sync("u1", "D1", Some(DateTime::<Utc>::UNIX_EPOCH)).await.unwrap();
    assert!(delta.events.is_empty());
}

/// Scenario 3 — bandwidth optimization collapses a per-resource run to
/// its latest event while preserving cross-resource chronology.
#[tokio::test]
async fn bandwidth_optimization_keeps_latest_per_resource_in_global_order() {
    let svc = test_service().await;
    let now = Utc::now();

    let mut e1 = bookmark_event("u", "B1", "Dx", "{}");
    e1.timestamp = now - Duration::minutes(30);
    let mut e2 = bookmark_event("u", "B1", "Dx", "{}");
    e2.timestamp = now - Duration::minutes(20);
    let mut e3 = bookmark_event("u", "B1", "Dx", "{}");
    e3.timestamp = now - Duration::minutes(10);
    let mut e4 = bookmark_event("u", "B2", "Dx", "{}");
    e4.timestamp = now - Duration::minutes(15);

    for e in [e1, e2, e3, e4] {
        svc.create_sync_event(e).await.unwrap();
    }

    let delta = svc
        .get_delta_sync("u", "Dy", Some(now - Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(delta.events.len(), 2);
    assert_eq!(delta.events[0].resource_id, "B2");
    assert_eq!(delta.events[1].resource_id, "B1");
    assert!(delta.events[0].timestamp < delta.events[1].timestamp);
}

/// Scenario 4 — conflict resolution breaks equal-timestamp ties by the
/// greater id.
#[test]
fn resolve_breaks_equal_timestamp_ties_by_id() {
    let now = Utc::now();
    let mut e_a = bookmark_event("u", "B1", "Da", "{}");
    e_a.id = 7;
    e_a.timestamp = now;
    let mut e_b = bookmark_event("u", "B1", "Db", "{}");
    e_b.id = 9;
    e_b.timestamp = now;

    let winner = sync_core::sync::resolve(&[e_a, e_b]).unwrap();
    assert_eq!(winner.id, 9);
}

/// Scenario 5 — offline replay is idempotent: two calls to
/// `process_offline` deliver each event to the bus exactly once and
/// leave every affected row `synced`.
#[tokio::test]
async fn offline_replay_idempotence() {
    let svc = test_service().await;
    svc.queue_offline(bookmark_event("u1", "B1", "D1", "{}")).await.unwrap();
    svc.queue_offline(bookmark_event("u1", "B2", "D1", "{}")).await.unwrap();

    svc.process_offline("u1", "D1").await.unwrap();
    svc.process_offline("u1", "D1").await.unwrap();

    assert!(svc.get_offline_queue("u1", "D1").await.unwrap().is_empty());
}

/// (P5) `get_or_create` converges concurrent creators on one row.
#[tokio::test]
async fn concurrent_sync_state_creation_converges() {
    let states = Arc::new(SqliteSyncStateStore::in_memory().await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let states = states.clone();
        handles.push(tokio::spawn(async move {
            states.get_or_create("u1", "d1").await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }

    assert!(ids.iter().all(|id| *id == ids[0]));
}

/// Boundary: `get_delta_sync` with a zero cursor returns every event
/// for the user not originating from the requesting device.
#[tokio::test]
async fn get_delta_sync_with_zero_cursor_returns_full_history() {
    let svc = test_service().await;
    svc.create_sync_event(bookmark_event("u1", "B1", "D1", "{}")).await.unwrap();
    svc.create_sync_event(bookmark_event("u1", "B2", "D1", "{}")).await.unwrap();

    let delta = svc
        .get_delta_sync("u1", "D2", Some(DateTime::<Utc>::UNIX_EPOCH))
        .await
        .unwrap();
    assert_eq!(delta.events.len(), 2);
}

/// A delete event competes on timestamp like any other event; it does
/// not carry special priority in `resolve`.
#[test]
fn delete_event_has_no_special_priority() {
    let now = Utc::now();
    let mut delete = bookmark_event("u", "B1", "D1", "{}");
    delete.action = SyncAction::Delete;
    delete.event_type = SyncEventType::BookmarkDeleted;
    delete.id = 1;
    delete.timestamp = now - Duration::minutes(5);

    let mut later_update = bookmark_event("u", "B1", "D1", "{}");
    later_update.id = 2;
    later_update.timestamp = now;

    let winner = sync_core::sync::resolve(&[delete, later_update]).unwrap();
    assert_eq!(winner.id, 2);
    assert_eq!(winner.status, SyncStatus::Pending);
}
