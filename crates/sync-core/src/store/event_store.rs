//! Event Store — append-only log of sync events (spec §4.1, §6.3).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{SyncAction, SyncEvent, SyncEventType, SyncStatus};

/// Durable, ordered log of [`SyncEvent`]s.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Validate and insert `event`, assigning its `id` and stamping its
    /// timestamp if unset. Returns the stored event.
    async fn append(&self, event: SyncEvent) -> Result<SyncEvent>;

    /// Events for `user_id` not originating from `exclude_device_id`,
    /// with `timestamp > since_timestamp`, ascending by `(timestamp, id)`.
    async fn query_delta(
        &self,
        user_id: &str,
        exclude_device_id: &str,
        since_timestamp: DateTime<Utc>,
    ) -> Result<Vec<SyncEvent>>;

    /// Pending events for a `(user_id, device_id)` pair, ascending by timestamp.
    async fn query_offline(&self, user_id: &str, device_id: &str) -> Result<Vec<SyncEvent>>;

    /// Atomic status transition. Only `pending -> synced` and
    /// `pending -> failed` are legal.
    async fn mark_status(&self, event_id: i64, status: SyncStatus) -> Result<()>;

    /// Distinct `(user_id, device_id)` pairs with at least one `pending`
    /// event, for the background replay sweep.
    async fn list_pending_devices(&self) -> Result<Vec<(String, String)>>;
}

/// SQLite-backed [`EventStore`].
pub struct SqliteEventStore {
    pool: Pool<Sqlite>,
}

impl SqliteEventStore {
    /// Open (creating if absent) the database at `db_path` and run migrations.
    pub async fn new(db_path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                user_id TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                action TEXT NOT NULL,
                data TEXT NOT NULL,
                device_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                timestamp TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sync_events_user_timestamp
            ON sync_events(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_sync_events_resource
            ON sync_events(resource_id);
            CREATE INDEX IF NOT EXISTS idx_sync_events_device
            ON sync_events(device_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The greatest timestamp already recorded for `device_id`, used to
    /// enforce per-device monotonicity on append.
    async fn last_device_timestamp(&self, device_id: &str) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(timestamp) AS ts FROM sync_events WHERE device_id = ?")
            .bind(device_id)
            .fetch_one(&self.pool)
            .await?;

        let ts: Option<String> = row.get("ts");
        Ok(ts.and_then(|s| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.into())))
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<SyncEvent> {
        let type_str: String = row.get("type");
        let action_str: String = row.get("action");
        let status_str: String = row.get("status");

        Ok(SyncEvent {
            id: row.get("id"),
            event_type: SyncEventType::parse(&type_str)
                .ok_or_else(|| Error::Internal(format!("unrecognized event type {type_str}")))?,
            user_id: row.get("user_id"),
            resource_id: row.get("resource_id"),
            action: SyncAction::parse(&action_str)
                .ok_or_else(|| Error::Internal(format!("unrecognized action {action_str}")))?,
            data: row.get("data"),
            device_id: row.get("device_id"),
            status: SyncStatus::parse(&status_str)
                .ok_or_else(|| Error::Internal(format!("unrecognized status {status_str}")))?,
            timestamp: parse_rfc3339(row.get("timestamp"))?,
            created_at: parse_rfc3339(row.get("created_at"))?,
            updated_at: parse_rfc3339(row.get("updated_at"))?,
        })
    }
}

fn parse_rfc3339(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.into())
        .map_err(|e| Error::Internal(format!("invalid stored timestamp {s}: {e}")))
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append(&self, mut event: SyncEvent) -> Result<SyncEvent> {
        if event.user_id.trim().is_empty() {
            return Err(Error::InvalidEvent("user_id must not be empty".into()));
        }
        if event.device_id.trim().is_empty() {
            return Err(Error::InvalidEvent("device_id must not be empty".into()));
        }
        if event.resource_id.trim().is_empty() {
            return Err(Error::InvalidEvent("resource_id must not be empty".into()));
        }

        let now = Utc::now();
        if event.has_unset_timestamp() {
            event.timestamp = now;
        } else if let Some(last) = self.last_device_timestamp(&event.device_id).await? {
            if event.timestamp < last {
                event.timestamp = last + Duration::microseconds(1);
            }
        }

        event.created_at = now;
        event.updated_at = now;

        let row = sqlx::query(
            r#"
            INSERT INTO sync_events
            (type, user_id, resource_id, action, data, device_id, status, timestamp, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(&event.user_id)
        .bind(&event.resource_id)
        .bind(event.action.as_str())
        .bind(&event.data)
        .bind(&event.device_id)
        .bind(event.status.as_str())
        .bind(event.timestamp.to_rfc3339())
        .bind(event.created_at.to_rfc3339())
        .bind(event.updated_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        event.id = row.get("id");
        Ok(event)
    }

    async fn query_delta(
        &self,
        user_id: &str,
        exclude_device_id: &str,
        since_timestamp: DateTime<Utc>,
    ) -> Result<Vec<SyncEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, type, user_id, resource_id, action, data, device_id, status, timestamp, created_at, updated_at
            FROM sync_events
            WHERE user_id = ? AND device_id != ? AND timestamp > ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(exclude_device_id)
        .bind(since_timestamp.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn query_offline(&self, user_id: &str, device_id: &str) -> Result<Vec<SyncEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, type, user_id, resource_id, action, data, device_id, status, timestamp, created_at, updated_at
            FROM sync_events
            WHERE user_id = ? AND device_id = ? AND status = 'pending'
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn mark_status(&self, event_id: i64, status: SyncStatus) -> Result<()> {
        if status == SyncStatus::Pending {
            return Err(Error::IllegalStateTransition(
                "cannot transition back to pending".into(),
            ));
        }

        let result = sqlx::query(
            "UPDATE sync_events SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::IllegalStateTransition(format!(
                "event {event_id} is not pending or does not exist"
            )));
        }

        Ok(())
    }

    async fn list_pending_devices(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT DISTINCT user_id, device_id FROM sync_events WHERE status = 'pending'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("user_id"), row.get("device_id")))
            .collect())
    }
}
