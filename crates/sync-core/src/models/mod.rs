//! Sync data model
//!
//! The types the rest of the crate is built around: [`SyncEvent`] (the
//! append-only log entry), [`SyncState`] (the per-device cursor), and
//! [`DeltaSync`] (what a device receives when it catches up).

mod delta;
mod sync_event;
mod sync_state;

pub use delta::DeltaSync;
pub use sync_event::{SyncAction, SyncEvent, SyncEventType, SyncStatus};
pub use sync_state::SyncState;
