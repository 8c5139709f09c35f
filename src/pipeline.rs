//! Wiring from configuration to a ready indexer and retriever.
//!
//! [`Pipeline`] owns one SQLite pool shared by the manual snapshots and the
//! vector store, one embedding provider, and the [`Indexer`] / [`Retriever`]
//! built over them. Both the CLI and the HTTP server go through it.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::config::Config;
use crate::db;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::indexer::Indexer;
use crate::manuals::ManualStore;
use crate::migrate;
use crate::models::{IndexReport, Manual, RetrievedChunk};
use crate::retriever::Retriever;
use crate::store::sqlite::SqliteStore;
use crate::store::VectorStore;

pub struct Pipeline {
    config: Config,
    manuals: ManualStore,
    store: Arc<dyn VectorStore>,
    indexer: Indexer,
    retriever: Retriever,
}

impl Pipeline {
    /// Open the configured database, create the schema if needed, and build
    /// the configured embedding provider.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate(&pool).await?;
        let provider = create_provider(&config.embedding)?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteStore::new(pool.clone()));
        Ok(Self::from_parts(
            config.clone(),
            ManualStore::new(pool),
            provider,
            store,
        ))
    }

    /// Assemble a pipeline from already-built parts.
    pub fn from_parts(
        config: Config,
        manuals: ManualStore,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let metric = config.retrieval.metric;
        let indexer = Indexer::new(provider.clone(), store.clone(), metric);
        let retriever = Retriever::new(provider, store.clone(), metric);
        Self {
            config,
            manuals,
            store,
            indexer,
            retriever,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manuals(&self) -> &ManualStore {
        &self.manuals
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Index a manual given inline, or the stored snapshot when `body` is
    /// `None`.
    pub async fn index_manual(&self, manual_id: i64, body: Option<&Value>) -> RagResult<IndexReport> {
        // Refuse before the disabled provider's parameters get recorded.
        if !self.config.embedding.is_enabled() {
            return Err(RagError::Provider(anyhow::anyhow!(
                "embedding provider is disabled; set [embedding].provider"
            )));
        }
        let manual = match body {
            Some(body) => Manual::from_json(body),
            None => self
                .manuals
                .get(manual_id)
                .await
                .map_err(RagError::Store)?
                .ok_or(RagError::ManualNotFound(manual_id))?,
        };
        self.indexer.index(manual_id, &manual).await
    }

    /// Retrieve with a caller-supplied limit, validated against
    /// `[retrieval]`. Only a bad limit is an error; every other failure
    /// degrades to an empty result.
    pub async fn retrieve(
        &self,
        manual_id: i64,
        query: &str,
        limit: Option<usize>,
    ) -> RagResult<Vec<RetrievedChunk>> {
        let limit = self
            .config
            .retrieval
            .resolve_limit(limit)
            .map_err(|e| RagError::InvalidRequest(e.to_string()))?;
        Ok(self.retriever.retrieve(manual_id, query, limit).await)
    }
}
