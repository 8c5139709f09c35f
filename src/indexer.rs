//! Write path: chunk a manual, embed each chunk, persist the records.
//!
//! One indexing pass is strictly sequential: for each chunk, one embedding
//! call and one storage write complete before the next chunk starts. A chunk
//! whose embedding or write fails is logged and skipped; the pass carries on
//! with the rest. Only a pass in which every chunk fails is reported as an
//! error, as is a store whose recorded index parameters disagree with the
//! configured provider and metric. A pass that fails every chunk leaves the
//! manual's stored records untouched.

use std::sync::Arc;

use crate::chunk::{chunk_manual, content_hash};
use crate::embedding::{embed_one, DistanceMetric, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::lock::ManualLocks;
use crate::models::{Chunk, EmbeddingRecord, IndexMeta, IndexReport, Manual};
use crate::store::VectorStore;

pub struct Indexer {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    metric: DistanceMetric,
    locks: ManualLocks,
}

enum ChunkOutcome {
    Embedded,
    Reused,
}

impl Indexer {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            provider,
            store,
            metric,
            locks: ManualLocks::new(),
        }
    }

    /// Index parameters this indexer writes with.
    pub fn index_meta(&self) -> IndexMeta {
        IndexMeta {
            model: self.provider.model_name().to_string(),
            dims: self.provider.dims(),
            metric: self.metric,
        }
    }

    /// Index `manual` under `manual_id`, replacing whatever a previous pass
    /// stored for it.
    pub async fn index(&self, manual_id: i64, manual: &Manual) -> RagResult<IndexReport> {
        if self.locks.is_locked(manual_id) {
            tracing::info!(manual_id, "indexing pass already running; waiting");
        }
        let _lease = self.locks.acquire(manual_id).await;

        self.check_index_meta().await?;

        let chunks = chunk_manual(manual);
        let mut report = IndexReport {
            manual_id,
            chunks: chunks.len(),
            ..IndexReport::default()
        };
        let mut first_error: Option<RagError> = None;
        let mut failed_positions = Vec::new();

        for (position, chunk) in chunks.iter().enumerate() {
            let position = position as i64;
            match self.index_chunk(manual_id, position, chunk).await {
                Ok(ChunkOutcome::Embedded) => report.embedded += 1,
                Ok(ChunkOutcome::Reused) => report.reused += 1,
                Err(e) => {
                    tracing::warn!(
                        manual_id,
                        position,
                        chunk_type = chunk.kind(),
                        error = %e,
                        "skipping chunk"
                    );
                    report.failed += 1;
                    failed_positions.push(position);
                    first_error.get_or_insert(e);
                }
            }
        }

        // Nothing new was written, so the previous version stays as it was.
        if report.persisted() == 0 {
            if let Some(source) = first_error {
                return Err(RagError::IndexUnavailable {
                    manual_id,
                    chunks: report.chunks,
                    source: Box::new(source),
                });
            }
        }

        // A failed chunk must not leave an older version behind.
        for position in failed_positions {
            if let Err(e) = self.store.remove(manual_id, position).await {
                tracing::warn!(manual_id, position, error = %e, "could not clear stale record");
            }
        }
        match self.store.prune(manual_id, chunks.len() as i64).await {
            Ok(pruned) => report.pruned = pruned,
            Err(e) => tracing::warn!(manual_id, error = %e, "could not prune stale records"),
        }

        tracing::info!(
            manual_id,
            chunks = report.chunks,
            embedded = report.embedded,
            reused = report.reused,
            failed = report.failed,
            pruned = report.pruned,
            "indexed manual"
        );
        Ok(report)
    }

    async fn check_index_meta(&self) -> RagResult<()> {
        let wanted = self.index_meta();
        let recorded = self
            .store
            .init_index_meta(&wanted)
            .await
            .map_err(RagError::Store)?;
        if recorded != wanted {
            return Err(RagError::IndexMismatch(format!(
                "store was built with model '{}' ({} dims, {}), configured '{}' ({} dims, {})",
                recorded.model,
                recorded.dims,
                recorded.metric,
                wanted.model,
                wanted.dims,
                wanted.metric
            )));
        }
        Ok(())
    }

    async fn index_chunk(
        &self,
        manual_id: i64,
        position: i64,
        chunk: &Chunk,
    ) -> RagResult<ChunkOutcome> {
        let content = chunk.to_canonical();
        let hash = content_hash(&content);

        let stored = self
            .store
            .stored_hash(manual_id, position)
            .await
            .map_err(RagError::Store)?;
        if stored.as_deref() == Some(hash.as_str()) {
            return Ok(ChunkOutcome::Reused);
        }

        let embedding = embed_one(self.provider.as_ref(), &content)
            .await
            .map_err(RagError::Provider)?;
        if embedding.len() != self.provider.dims() {
            return Err(RagError::DimensionMismatch {
                expected: self.provider.dims(),
                actual: embedding.len(),
            });
        }

        let record = EmbeddingRecord {
            manual_id,
            position,
            chunk_type: chunk.kind().to_string(),
            content,
            content_hash: hash,
            embedding,
        };
        self.store.upsert(&record).await.map_err(RagError::Store)?;
        Ok(ChunkOutcome::Embedded)
    }
}
