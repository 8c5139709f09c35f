//! Core data models used throughout the pipeline.
//!
//! A [`Manual`] is decomposed into [`Chunk`]s, each chunk is embedded and
//! persisted as an [`EmbeddingRecord`], and retrieval hands back
//! [`RetrievedChunk`]s ordered nearest-first.

use serde::{Deserialize, Serialize};

use crate::embedding::DistanceMetric;

/// A structured onboarding manual: one goal, ordered procedure steps, and
/// ordered precautions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manual {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub procedure: Vec<ProcedureStep>,
    #[serde(default)]
    pub precaution: Vec<String>,
}

/// One procedure step: what to do (`step`) and how/why (`details`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub step: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// One retrievable semantic unit derived from a [`Manual`].
///
/// Serialized as `{"type": ..., "content": ...}`. A procedure chunk keeps its
/// step label and details together so retrieval returns both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Chunk {
    Goal(String),
    Procedure(ProcedureStep),
    Precaution(String),
    /// Content stored without structure (older rows); only produced on read.
    Text(String),
}

/// A persisted (chunk, embedding) pair scoped to a manual.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub manual_id: i64,
    /// Index of the chunk within the manual's chunk sequence.
    pub position: i64,
    pub chunk_type: String,
    /// Canonical serialized chunk.
    pub content: String,
    /// SHA-256 of `content`, used to skip re-embedding unchanged chunks.
    pub content_hash: String,
    pub embedding: Vec<f32>,
}

/// A stored record returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub manual_id: i64,
    pub position: i64,
    pub content: String,
    pub distance: f64,
}

/// Parameters the stored vectors were built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexMeta {
    pub model: String,
    pub dims: usize,
    pub metric: DistanceMetric,
}

/// A chunk handed back by the retriever.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub manual_id: i64,
    pub position: i64,
    pub distance: f64,
    pub chunk: Chunk,
}

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub manual_id: i64,
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Chunks embedded and written in this pass.
    pub embedded: usize,
    /// Chunks whose stored record was already current.
    pub reused: usize,
    /// Chunks skipped because the provider or store failed.
    pub failed: usize,
    /// Stale records removed from a previous, longer version of the manual.
    pub pruned: u64,
}

impl IndexReport {
    /// Number of chunks retrievable for the manual after this pass.
    pub fn persisted(&self) -> usize {
        self.embedded + self.reused
    }
}
