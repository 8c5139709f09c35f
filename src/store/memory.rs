//! In-memory [`VectorStore`] implementation for tests and demos.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Nearest-neighbour search is a
//! brute-force scan of one manual's records.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::DistanceMetric;
use crate::models::{EmbeddingRecord, IndexMeta, ScoredRecord};

use super::{rank, VectorStore};

pub struct InMemoryStore {
    records: RwLock<Vec<EmbeddingRecord>>,
    meta: RwLock<Option<IndexMeta>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            meta: RwLock::new(None),
        }
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Vec<EmbeddingRecord> {
        self.records.read().unwrap().clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        let mut records = self.records.write().unwrap();
        match records
            .iter_mut()
            .find(|r| r.manual_id == record.manual_id && r.position == record.position)
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn stored_hash(&self, manual_id: i64, position: i64) -> Result<Option<String>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|r| r.manual_id == manual_id && r.position == position)
            .map(|r| r.content_hash.clone()))
    }

    async fn remove(&self, manual_id: i64, position: i64) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|r| !(r.manual_id == manual_id && r.position == position));
        Ok(records.len() != before)
    }

    async fn prune(&self, manual_id: i64, keep: i64) -> Result<u64> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|r| !(r.manual_id == manual_id && r.position >= keep));
        Ok((before - records.len()) as u64)
    }

    async fn query_nearest(
        &self,
        manual_id: i64,
        embedding: &[f32],
        limit: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<ScoredRecord>> {
        let records = self.records.read().unwrap();
        let scored: Vec<ScoredRecord> = records
            .iter()
            .filter(|r| r.manual_id == manual_id)
            .map(|r| ScoredRecord {
                manual_id: r.manual_id,
                position: r.position,
                content: r.content.clone(),
                distance: metric.distance(embedding, &r.embedding),
            })
            .collect();
        Ok(rank(scored, limit))
    }

    async fn count(&self, manual_id: i64) -> Result<usize> {
        let records = self.records.read().unwrap();
        Ok(records.iter().filter(|r| r.manual_id == manual_id).count())
    }

    async fn index_meta(&self) -> Result<Option<IndexMeta>> {
        Ok(self.meta.read().unwrap().clone())
    }

    async fn init_index_meta(&self, meta: &IndexMeta) -> Result<IndexMeta> {
        let mut stored = self.meta.write().unwrap();
        Ok(stored.get_or_insert_with(|| meta.clone()).clone())
    }
}
