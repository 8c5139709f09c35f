//! TOML configuration parsing and validation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::embedding::DistanceMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for self-hosted providers (Ollama).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// `k` used when a caller does not pass an explicit limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            metric: DistanceMetric::default(),
        }
    }
}

fn default_limit() -> usize {
    3
}
fn default_max_limit() -> usize {
    50
}

impl RetrievalConfig {
    /// Resolve a caller-supplied limit, falling back to the configured default.
    pub fn resolve_limit(&self, requested: Option<usize>) -> Result<usize> {
        let limit = requested.unwrap_or(self.default_limit);
        if limit == 0 {
            anyhow::bail!("limit must be >= 1");
        }
        if limit > self.max_limit {
            anyhow::bail!("limit must be <= {}", self.max_limit);
        }
        Ok(limit)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "hash" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, hash, or local.",
            other
        ),
    }

    // Remote providers must pin their model and vector width; the offline
    // providers have defaults.
    if matches!(config.embedding.provider.as_str(), "openai" | "ollama") {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.retrieval.max_limit == 0 {
        anyhow::bail!("retrieval.max_limit must be >= 1");
    }
    if config.retrieval.default_limit == 0
        || config.retrieval.default_limit > config.retrieval.max_limit
    {
        anyhow::bail!(
            "retrieval.default_limit must be in [1, {}]",
            config.retrieval.max_limit
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = parse_config("[db]\npath = \"/tmp/x.sqlite\"\n").unwrap();
        assert_eq!(cfg.embedding.provider, "disabled");
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.retrieval.default_limit, 3);
        assert_eq!(cfg.retrieval.metric, DistanceMetric::L2);
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let err = parse_config(
            "[db]\npath = \"x\"\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse_config("[db]\npath = \"x\"\n[embedding]\nprovider = \"bert\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let res = parse_config("[db]\npath = \"x\"\n[retrieval]\nmetric = \"manhattan\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_metric_parsed() {
        let cfg = parse_config("[db]\npath = \"x\"\n[retrieval]\nmetric = \"cosine\"\n").unwrap();
        assert_eq!(cfg.retrieval.metric, DistanceMetric::Cosine);
    }

    #[test]
    fn test_default_limit_bounds() {
        let err = parse_config("[db]\npath = \"x\"\n[retrieval]\ndefault_limit = 0\n").unwrap_err();
        assert!(err.to_string().contains("default_limit"));
        let err = parse_config(
            "[db]\npath = \"x\"\n[retrieval]\ndefault_limit = 9\nmax_limit = 8\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_limit"));
    }

    #[test]
    fn test_resolve_limit() {
        let r = RetrievalConfig::default();
        assert_eq!(r.resolve_limit(None).unwrap(), 3);
        assert_eq!(r.resolve_limit(Some(8)).unwrap(), 8);
        assert!(r.resolve_limit(Some(0)).is_err());
        assert!(r.resolve_limit(Some(51)).is_err());
    }
}
