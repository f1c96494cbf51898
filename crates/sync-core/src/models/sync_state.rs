//! SyncState — the per-device cursor (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per `(user_id, device_id)`. Uniqueness is enforced by the
/// storage layer (spec I4); the Rust type carries no constraint of its
/// own beyond what the store guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub id: i64,
    pub user_id: String,
    pub device_id: String,
    pub last_sync_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
