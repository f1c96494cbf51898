//! Persistence layer: the Event Store and Sync-State Store (spec §4.1, §4.2).

mod event_store;
mod sync_state_store;

pub use event_store::{EventStore, SqliteEventStore};
pub use sync_state_store::{SqliteSyncStateStore, SyncStateStore};
