//! Read path: embed a query and return a manual's nearest chunks.
//!
//! [`Retriever::retrieve`] never fails. Provider outages, store outages,
//! and parameter mismatches are logged and produce an empty result, which
//! downstream generation treats as "no context". [`Retriever::try_retrieve`]
//! exposes the underlying error for callers that want it.

use std::sync::Arc;

use crate::embedding::{embed_one, DistanceMetric, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::models::{Chunk, RetrievedChunk};
use crate::store::VectorStore;

pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    metric: DistanceMetric,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        metric: DistanceMetric,
    ) -> Self {
        Self {
            provider,
            store,
            metric,
        }
    }

    /// Up to `limit` chunks of `manual_id`, nearest-first; empty on any failure.
    pub async fn retrieve(&self, manual_id: i64, query: &str, limit: usize) -> Vec<RetrievedChunk> {
        match self.try_retrieve(manual_id, query, limit).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(manual_id, limit, error = %e, "retrieval degraded to empty context");
                Vec::new()
            }
        }
    }

    pub async fn try_retrieve(
        &self,
        manual_id: i64,
        query: &str,
        limit: usize,
    ) -> RagResult<Vec<RetrievedChunk>> {
        if limit == 0 {
            return Err(RagError::InvalidRequest("limit must be >= 1".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        self.check_index_meta().await?;

        let query_vec = embed_one(self.provider.as_ref(), query)
            .await
            .map_err(RagError::Provider)?;
        if query_vec.len() != self.provider.dims() {
            return Err(RagError::DimensionMismatch {
                expected: self.provider.dims(),
                actual: query_vec.len(),
            });
        }

        let rows = self
            .store
            .query_nearest(manual_id, &query_vec, limit, self.metric)
            .await
            .map_err(RagError::Store)?;

        let chunks: Vec<RetrievedChunk> = rows
            .into_iter()
            .filter(|row| row.manual_id == manual_id)
            .take(limit)
            .map(|row| RetrievedChunk {
                manual_id: row.manual_id,
                position: row.position,
                distance: row.distance,
                chunk: Chunk::from_stored(&row.content),
            })
            .collect();

        tracing::debug!(manual_id, limit, hits = chunks.len(), "retrieved chunks");
        Ok(chunks)
    }

    /// Vectors built under another model or metric are not comparable with
    /// the query vector; refuse rather than return meaningless distances.
    async fn check_index_meta(&self) -> RagResult<()> {
        let Some(recorded) = self.store.index_meta().await.map_err(RagError::Store)? else {
            // Nothing has been indexed yet.
            return Ok(());
        };
        if recorded.model != self.provider.model_name()
            || recorded.dims != self.provider.dims()
            || recorded.metric != self.metric
        {
            return Err(RagError::IndexMismatch(format!(
                "store holds '{}' ({} dims, {}), query uses '{}' ({} dims, {})",
                recorded.model,
                recorded.dims,
                recorded.metric,
                self.provider.model_name(),
                self.provider.dims(),
                self.metric
            )));
        }
        Ok(())
    }
}

/// Render retrieved chunks as a JSON array for prompt interpolation.
pub fn context_json(chunks: &[RetrievedChunk]) -> serde_json::Value {
    serde_json::Value::Array(
        chunks
            .iter()
            .map(|c| serde_json::to_value(&c.chunk).unwrap_or(serde_json::Value::Null))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashProvider;
    use crate::indexer::Indexer;
    use crate::models::{EmbeddingRecord, Manual, ProcedureStep};
    use crate::store::memory::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, Indexer, Retriever) {
        let store = Arc::new(InMemoryStore::new());
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashProvider::new(64));
        let indexer = Indexer::new(provider.clone(), store.clone(), DistanceMetric::L2);
        let retriever = Retriever::new(provider, store.clone(), DistanceMetric::L2);
        (store, indexer, retriever)
    }

    #[tokio::test]
    async fn test_unknown_manual_is_empty() {
        let (_, _, retriever) = setup();
        assert!(retriever.retrieve(99, "인사", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_limit_zero_is_invalid() {
        let (_, _, retriever) = setup();
        let err = retriever.try_retrieve(1, "인사", 0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidRequest(_)));
        assert!(retriever.retrieve(1, "인사", 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let (_, indexer, retriever) = setup();
        let manual = Manual {
            goal: Some("목표".to_string()),
            ..Manual::default()
        };
        indexer.index(1, &manual).await.unwrap();
        assert!(retriever.try_retrieve(1, "   ", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_procedure_round_trip() {
        let (_, indexer, retriever) = setup();
        let step = ProcedureStep {
            step: "1. 인사".to_string(),
            details: vec!["밝게 인사하기".to_string()],
        };
        let manual = Manual {
            procedure: vec![step.clone()],
            ..Manual::default()
        };
        indexer.index(7, &manual).await.unwrap();
        let hits = retriever.retrieve(7, "인사", 3).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, Chunk::Procedure(step));
        assert_eq!(hits[0].manual_id, 7);
    }

    #[tokio::test]
    async fn test_legacy_rows_fall_back_to_text() {
        let (store, indexer, retriever) = setup();
        // Record index parameters the way a pass would.
        indexer.index(3, &Manual::default()).await.unwrap();
        let provider = HashProvider::new(64);
        store
            .upsert(&EmbeddingRecord {
                manual_id: 3,
                position: 0,
                chunk_type: "text".to_string(),
                content: "손님 오면 바로 인사하기".to_string(),
                content_hash: String::new(),
                embedding: provider.embed_text("손님 오면 바로 인사하기"),
            })
            .await
            .unwrap();
        let hits = retriever.retrieve(3, "인사", 3).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, Chunk::Text("손님 오면 바로 인사하기".to_string()));
    }

    #[test]
    fn test_context_json_shape() {
        let chunks = vec![RetrievedChunk {
            manual_id: 1,
            position: 0,
            distance: 0.5,
            chunk: Chunk::Goal("목표".to_string()),
        }];
        assert_eq!(
            context_json(&chunks),
            serde_json::json!([{"type": "goal", "content": "목표"}])
        );
    }
}
