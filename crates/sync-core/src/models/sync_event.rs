//! SyncEvent — one observed mutation in the append-only event log.
//!
//! Fields and invariants per the event store contract: every event is
//! immutable after insertion except `status` and `updated_at` (I1), and
//! `timestamp` is monotonically non-decreasing per `device_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of mutation kinds the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    BookmarkCreated,
    BookmarkUpdated,
    BookmarkDeleted,
    CollectionCreated,
    CollectionUpdated,
    CollectionDeleted,
}

impl SyncEventType {
    pub const ALL: [SyncEventType; 6] = [
        SyncEventType::BookmarkCreated,
        SyncEventType::BookmarkUpdated,
        SyncEventType::BookmarkDeleted,
        SyncEventType::CollectionCreated,
        SyncEventType::CollectionUpdated,
        SyncEventType::CollectionDeleted,
    ];

    /// Parse from the wire/column representation (`"bookmark_created"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "bookmark_created" => SyncEventType::BookmarkCreated,
            "bookmark_updated" => SyncEventType::BookmarkUpdated,
            "bookmark_deleted" => SyncEventType::BookmarkDeleted,
            "collection_created" => SyncEventType::CollectionCreated,
            "collection_updated" => SyncEventType::CollectionUpdated,
            "collection_deleted" => SyncEventType::CollectionDeleted,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventType::BookmarkCreated => "bookmark_created",
            SyncEventType::BookmarkUpdated => "bookmark_updated",
            SyncEventType::BookmarkDeleted => "bookmark_deleted",
            SyncEventType::CollectionCreated => "collection_created",
            SyncEventType::CollectionUpdated => "collection_updated",
            SyncEventType::CollectionDeleted => "collection_deleted",
        }
    }
}

/// Redundant with `type` but preserved for external consumers (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "create" => SyncAction::Create,
            "update" => SyncAction::Update,
            "delete" => SyncAction::Delete,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

/// Status transitions are restricted to `pending -> synced` and
/// `pending -> failed`; see `EventStore::mark_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Pending
    }
}

impl SyncStatus {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => SyncStatus::Pending,
            "synced" => SyncStatus::Synced,
            "failed" => SyncStatus::Failed,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }
}

/// One observed mutation, as stored in `sync_events` (spec §6.3).
///
/// `data` is passed through as an opaque string; the core never parses
/// its schema (spec §9 — "JSON-serialized opaque payload").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Server-assigned monotonic id. `0` until `EventStore::append` runs.
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
    pub user_id: String,
    pub resource_id: String,
    pub action: SyncAction,
    pub data: String,
    pub device_id: String,
    pub status: SyncStatus,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncEvent {
    /// Construct a new, not-yet-stored event with a zero-sentinel
    /// timestamp. `EventStore::append` treats a zero timestamp as a
    /// request to stamp the event with the current server instant
    /// (spec §4.1); `id`, `created_at`, and `updated_at` are likewise
    /// assigned by the store on insert.
    pub fn new(
        event_type: SyncEventType,
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        action: SyncAction,
        data: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id: 0,
            event_type,
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            action,
            data: data.into(),
            device_id: device_id.into(),
            status: SyncStatus::default(),
            timestamp: epoch,
            created_at: epoch,
            updated_at: epoch,
        }
    }

    /// Whether `timestamp` is the zero-sentinel requesting server stamping.
    pub fn has_unset_timestamp(&self) -> bool {
        self.timestamp == DateTime::<Utc>::UNIX_EPOCH
    }
}
