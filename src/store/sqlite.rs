//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors live as little-endian `f32` BLOBs in `manual_embeddings`, keyed by
//! `(manual_id, position)`. Nearest-neighbour queries load one manual's
//! vectors and rank them in Rust under the requested metric; a manual holds
//! tens of chunks, not millions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob, DistanceMetric};
use crate::models::{EmbeddingRecord, IndexMeta, ScoredRecord};

use super::{rank, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
///
/// Wraps a [`SqlitePool`]; each statement checks a connection out of the
/// pool and returns it when the statement completes or fails.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO manual_embeddings
                (manual_id, position, chunk_type, content, content_hash, embedding, dims, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(manual_id, position) DO UPDATE SET
                chunk_type = excluded.chunk_type,
                content = excluded.content,
                content_hash = excluded.content_hash,
                embedding = excluded.embedding,
                dims = excluded.dims,
                created_at = excluded.created_at
            "#,
        )
        .bind(record.manual_id)
        .bind(record.position)
        .bind(&record.chunk_type)
        .bind(&record.content)
        .bind(&record.content_hash)
        .bind(vec_to_blob(&record.embedding))
        .bind(record.embedding.len() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stored_hash(&self, manual_id: i64, position: i64) -> Result<Option<String>> {
        let hash = sqlx::query_scalar(
            "SELECT content_hash FROM manual_embeddings WHERE manual_id = ? AND position = ?",
        )
        .bind(manual_id)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    async fn remove(&self, manual_id: i64, position: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM manual_embeddings WHERE manual_id = ? AND position = ?")
                .bind(manual_id)
                .bind(position)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn prune(&self, manual_id: i64, keep: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM manual_embeddings WHERE manual_id = ? AND position >= ?")
                .bind(manual_id)
                .bind(keep)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn query_nearest(
        &self,
        manual_id: i64,
        embedding: &[f32],
        limit: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<ScoredRecord>> {
        let rows = sqlx::query(
            "SELECT position, content, embedding FROM manual_embeddings WHERE manual_id = ?",
        )
        .bind(manual_id)
        .fetch_all(&self.pool)
        .await?;

        let scored: Vec<ScoredRecord> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                ScoredRecord {
                    manual_id,
                    position: row.get("position"),
                    content: row.get("content"),
                    distance: metric.distance(embedding, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(scored, limit))
    }

    async fn count(&self, manual_id: i64) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM manual_embeddings WHERE manual_id = ?")
            .bind(manual_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn index_meta(&self) -> Result<Option<IndexMeta>> {
        let row = sqlx::query("SELECT model, dims, metric FROM index_meta WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<IndexMeta> {
            let metric: String = row.get("metric");
            let dims: i64 = row.get("dims");
            Ok(IndexMeta {
                model: row.get("model"),
                dims: dims as usize,
                metric: metric
                    .parse()
                    .with_context(|| "index_meta.metric holds an unknown metric")?,
            })
        })
        .transpose()
    }

    async fn init_index_meta(&self, meta: &IndexMeta) -> Result<IndexMeta> {
        sqlx::query(
            r#"
            INSERT INTO index_meta (id, model, dims, metric, created_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&meta.model)
        .bind(meta.dims as i64)
        .bind(meta.metric.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.index_meta()
            .await?
            .ok_or_else(|| anyhow::anyhow!("index_meta row missing after insert"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::migrate(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn record(manual_id: i64, position: i64, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            manual_id,
            position,
            chunk_type: "precaution".to_string(),
            content: format!("m{}p{}", manual_id, position),
            content_hash: format!("h{}", position),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_keyed() {
        let store = store().await;
        store.upsert(&record(1, 0, vec![1.0, 0.0])).await.unwrap();
        let mut again = record(1, 0, vec![0.0, 1.0]);
        again.content_hash = "changed".to_string();
        store.upsert(&again).await.unwrap();

        assert_eq!(store.count(1).await.unwrap(), 1);
        assert_eq!(
            store.stored_hash(1, 0).await.unwrap().as_deref(),
            Some("changed")
        );
        assert_eq!(store.stored_hash(1, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_nearest_orders_and_scopes() {
        let store = store().await;
        store.upsert(&record(1, 0, vec![1.0, 0.0])).await.unwrap();
        store.upsert(&record(1, 1, vec![0.0, 1.0])).await.unwrap();
        store.upsert(&record(2, 0, vec![0.0, 1.0])).await.unwrap();

        let hits = store
            .query_nearest(1, &[0.0, 1.0], 10, DistanceMetric::Cosine)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 1);
        assert_eq!(hits[0].content, "m1p1");
        assert!(hits.iter().all(|h| h.manual_id == 1));
    }

    #[tokio::test]
    async fn test_prune_and_remove() {
        let store = store().await;
        for p in 0..3 {
            store.upsert(&record(5, p, vec![1.0])).await.unwrap();
        }
        assert_eq!(store.prune(5, 1).await.unwrap(), 2);
        assert!(store.remove(5, 0).await.unwrap());
        assert_eq!(store.count(5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_meta_first_writer_wins() {
        let store = store().await;
        assert!(store.index_meta().await.unwrap().is_none());
        let first = IndexMeta {
            model: "text-embedding-3-small".to_string(),
            dims: 1536,
            metric: DistanceMetric::InnerProduct,
        };
        let second = IndexMeta {
            model: "other".to_string(),
            dims: 8,
            metric: DistanceMetric::L2,
        };
        assert_eq!(store.init_index_meta(&first).await.unwrap(), first);
        assert_eq!(store.init_index_meta(&second).await.unwrap(), first);
    }
}
