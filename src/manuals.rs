//! Persisted manual snapshots.
//!
//! Manuals are authored elsewhere and handed to this service as JSON. Each
//! snapshot is stored verbatim in the `manuals` table under an integer id,
//! which is the `manual_id` every embedding record is scoped to.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::models::Manual;

/// A stored snapshot together with its bookkeeping columns.
#[derive(Debug, Clone, Serialize)]
pub struct ManualSnapshot {
    pub id: i64,
    pub title: Option<String>,
    pub manual: Manual,
    pub created_at: String, // ISO8601
    pub updated_at: String, // ISO8601
}

#[derive(Clone)]
pub struct ManualStore {
    pool: SqlitePool,
}

impl ManualStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new snapshot and return its id.
    pub async fn create(&self, body: &Value) -> Result<i64> {
        let manual = Manual::from_json(body);
        let now = chrono::Utc::now().timestamp();
        let body_json = serde_json::to_string(body)?;

        let result = sqlx::query(
            "INSERT INTO manuals (title, body_json, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&manual.title)
        .bind(&body_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to insert manual")?;

        let id = result.last_insert_rowid();
        tracing::debug!(manual_id = id, "stored manual snapshot");
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Manual>> {
        Ok(self.get_snapshot(id).await?.map(|s| s.manual))
    }

    pub async fn get_snapshot(&self, id: i64) -> Result<Option<ManualSnapshot>> {
        let row = sqlx::query(
            "SELECT id, title, body_json, created_at, updated_at FROM manuals WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to read manual")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body_json: String = row.get("body_json");
        // Snapshots that no longer parse still yield an (empty) manual.
        let body: Value = serde_json::from_str(&body_json).unwrap_or(Value::Null);
        let created_at: i64 = row.get("created_at");
        let updated_at: i64 = row.get("updated_at");

        Ok(Some(ManualSnapshot {
            id: row.get("id"),
            title: row.get("title"),
            manual: Manual::from_json(&body),
            created_at: format_ts_iso(created_at),
            updated_at: format_ts_iso(updated_at),
        }))
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> ManualStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::migrate(&pool).await.unwrap();
        ManualStore::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store().await;
        let id = store
            .create(&json!({"title": "마감 청소", "goal": "깨끗한 매장", "precaution": "불 끄기"}))
            .await
            .unwrap();
        let snap = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snap.title.as_deref(), Some("마감 청소"));
        assert_eq!(snap.manual.goal.as_deref(), Some("깨끗한 매장"));
        assert_eq!(snap.manual.precaution, vec!["불 끄기"]);
        assert!(snap.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_missing_manual() {
        let store = store().await;
        assert!(store.get(12345).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let store = store().await;
        let a = store.create(&json!({"goal": "a"})).await.unwrap();
        let b = store.create(&json!({"goal": "b"})).await.unwrap();
        assert_ne!(a, b);
    }
}
