//! Error taxonomy for the indexing and retrieval pipeline.
//!
//! Storage backends and providers return `anyhow::Error`; the pipeline
//! classifies those into [`RagError`] so callers (the HTTP layer, the CLI)
//! can tell a provider outage from a store outage or a caller mistake.
//! Stored content that fails to parse is not an error here: it comes back
//! as `Chunk::Text`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// The embedding provider call failed (network, auth, rate limit).
    #[error("embedding provider error: {0:#}")]
    Provider(anyhow::Error),

    /// Storage connectivity or query failure.
    #[error("vector store error: {0:#}")]
    Store(anyhow::Error),

    /// A vector's length disagrees with the configured dimensionality.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The store was built with a different model, width, or metric.
    #[error("index mismatch: {0}")]
    IndexMismatch(String),

    /// Every chunk of an indexing pass failed.
    #[error("indexing manual {manual_id} failed for all {chunks} chunks: {source}")]
    IndexUnavailable {
        manual_id: i64,
        chunks: usize,
        #[source]
        source: Box<RagError>,
    },

    #[error("manual {0} not found")]
    ManualNotFound(i64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type RagResult<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_unavailable_carries_cause() {
        let err = RagError::IndexUnavailable {
            manual_id: 7,
            chunks: 2,
            source: Box::new(RagError::Provider(anyhow::anyhow!("connection refused"))),
        };
        let msg = err.to_string();
        assert!(msg.contains("manual 7"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = RagError::DimensionMismatch {
            expected: 1536,
            actual: 3,
        };
        assert_eq!(err.to_string(), "embedding has 3 dimensions, expected 1536");
    }
}
