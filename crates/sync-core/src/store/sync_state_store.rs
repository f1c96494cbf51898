//! Sync-State Store — per-device cursor with upsert semantics (spec §4.2, §6.3).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

use crate::error::Result;
use crate::models::SyncState;

/// Per-`(user_id, device_id)` cursor tracking.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Return the existing row for `(user_id, device_id)`, or insert and
    /// return a fresh one with `last_sync_time = now()` (I4).
    async fn get_or_create(&self, user_id: &str, device_id: &str) -> Result<SyncState>;

    /// Idempotent upsert. Accepts `last_sync_time` only if it is
    /// greater than or equal to the stored value; earlier values are
    /// silently ignored (no cursor regression).
    async fn update(
        &self,
        user_id: &str,
        device_id: &str,
        last_sync_time: DateTime<Utc>,
    ) -> Result<SyncState>;
}

/// SQLite-backed [`SyncStateStore`].
pub struct SqliteSyncStateStore {
    pool: Pool<Sqlite>,
}

impl SqliteSyncStateStore {
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
            CREATE TABLE IF NOT EXISTS sync_states (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                device_id TEXT NOT NULL,
                last_sync_time TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, device_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<SyncState> {
        Ok(SyncState {
            id: row.get("id"),
            user_id: row.get("user_id"),
            device_id: row.get("device_id"),
            last_sync_time: parse_rfc3339(row.get("last_sync_time"))?,
            created_at: parse_rfc3339(row.get("created_at"))?,
            updated_at: parse_rfc3339(row.get("updated_at"))?,
        })
    }

    async fn find(&self, user_id: &str, device_id: &str) -> Result<Option<SyncState>> {
        let row = sqlx::query(
            "SELECT id, user_id, device_id, last_sync_time, created_at, updated_at FROM sync_states WHERE user_id = ? AND device_id = ?",
        )
        .bind(user_id)
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_state).transpose()
    }
}

fn parse_rfc3339(s: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.into())
        .map_err(|e| crate::error::Error::Internal(format!("invalid stored timestamp {s}: {e}")))
}

#[async_trait]
impl SyncStateStore for SqliteSyncStateStore {
    async fn get_or_create(&self, user_id: &str, device_id: &str) -> Result<SyncState> {
        if let Some(existing) = self.find(user_id, device_id).await? {
            return Ok(existing);
        }

        let now = Utc::now().to_rfc3339();
        // INSERT OR IGNORE lets a losing concurrent creator fall through
        // to the follow-up read instead of erroring on the unique
        // constraint (I4: all callers converge on the same row).
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO sync_states (user_id, device_id, last_sync_time, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find(user_id, device_id)
            .await?
            .ok_or_else(|| crate::error::Error::Internal("sync state vanished after insert".into()))
    }

    async fn update(
        &self,
        user_id: &str,
        device_id: &str,
        last_sync_time: DateTime<Utc>,
    ) -> Result<SyncState> {
        self.get_or_create(user_id, device_id).await?;

        sqlx::query(
            r#"
            UPDATE sync_states SET last_sync_time = ?, updated_at = ?
            WHERE user_id = ? AND device_id = ? AND last_sync_time <= ?
            "#,
        )
        .bind(last_sync_time.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(device_id)
        .bind(last_sync_time.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find(user_id, device_id)
            .await?
            .ok_or_else(|| crate::error::Error::Internal("sync state vanished after update".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = SqliteSyncStateStore::in_memory().await.unwrap();
        let first = store.get_or_create("u1", "d1").await.unwrap();
        let second = store.get_or_create("u1", "d1").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn update_moves_cursor_forward() {
        let store = SqliteSyncStateStore::in_memory().await.unwrap();
        let state = store.get_or_create("u1", "d1").await.unwrap();
        let later = state.last_sync_time + Duration::seconds(60);

        let updated = store.update("u1", "d1", later).await.unwrap();
        assert_eq!(updated.last_sync_time, later);
    }

    #[tokio::test]
    async fn update_rejects_cursor_regression() {
        let store = SqliteSyncStateStore::in_memory().await.unwrap();
        let state = store.get_or_create("u1", "d1").await.unwrap();
        let later = state.last_sync_time + Duration::seconds(60);
        store.update("u1", "d1", later).await.unwrap();

        let earlier = state.last_sync_time - Duration::seconds(60);
        let after_regression = store.update("u1", "d1", earlier).await.unwrap();
        assert_eq!(after_regression.last_sync_time, later);
    }
}
