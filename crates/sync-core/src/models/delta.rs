//! DeltaSync — what a device receives when it catches up (spec §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SyncEvent;

/// An ordered, bandwidth-optimized batch of events plus the server
/// instant the caller should use as their next `last_sync_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaSync {
    /// Ascending by `(timestamp, id)`.
    pub events: Vec<SyncEvent>,
    pub timestamp: DateTime<Utc>,
}
