//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is everything the indexer and retriever need
//! from persistence: keyed upserts of embedding records, nearest-neighbour
//! queries scoped to one manual, and the index parameters the stored
//! vectors were built with.
//!
//! Backends:
//! - [`memory::InMemoryStore`]: `RwLock`-guarded vectors, for tests and demos.
//! - [`sqlite::SqliteStore`]: the `manual_embeddings` table via `sqlx`.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::DistanceMetric;
use crate::models::{EmbeddingRecord, IndexMeta, ScoredRecord};

/// Abstract storage backend for embedding records.
///
/// Records are keyed by `(manual_id, position)`. Every query is scoped to a
/// single `manual_id`; no method ever returns another manual's records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert or replace the record at `(manual_id, position)` |
/// | [`stored_hash`](VectorStore::stored_hash) | Content hash currently stored at a key |
/// | [`remove`](VectorStore::remove) | Delete the record at a key |
/// | [`prune`](VectorStore::prune) | Delete a manual's records at `position >= keep` |
/// | [`query_nearest`](VectorStore::query_nearest) | Top-`limit` records by ascending distance |
/// | [`count`](VectorStore::count) | Number of records for a manual |
/// | [`index_meta`](VectorStore::index_meta) | Recorded model / dims / metric |
/// | [`init_index_meta`](VectorStore::init_index_meta) | Record index parameters if none are recorded |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()>;

    async fn stored_hash(&self, manual_id: i64, position: i64) -> Result<Option<String>>;

    /// Returns whether a record was removed.
    async fn remove(&self, manual_id: i64, position: i64) -> Result<bool>;

    /// Returns the number of records removed.
    async fn prune(&self, manual_id: i64, keep: i64) -> Result<u64>;

    /// Nearest-first; ties are broken by position.
    async fn query_nearest(
        &self,
        manual_id: i64,
        embedding: &[f32],
        limit: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<ScoredRecord>>;

    async fn count(&self, manual_id: i64) -> Result<usize>;

    async fn index_meta(&self) -> Result<Option<IndexMeta>>;

    /// Store `meta` unless parameters are already recorded, and return the
    /// parameters in effect afterwards.
    async fn init_index_meta(&self, meta: &IndexMeta) -> Result<IndexMeta>;
}

/// Sort scored records nearest-first (position breaks ties) and keep `limit`.
pub(crate) fn rank(mut scored: Vec<ScoredRecord>, limit: usize) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });
    scored.truncate(limit);
    scored
}
