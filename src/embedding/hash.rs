//! Deterministic feature-hashing embedder.
//!
//! Maps each whitespace token and each character bigram of the input onto a
//! signed bucket of a fixed-width vector (FNV-1a), then L2-normalises. Texts
//! sharing words or syllables land close together, which is enough for
//! offline development, demos, and tests. It is not a semantic model.

use anyhow::Result;
use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

pub const DEFAULT_HASH_DIMS: usize = 256;
const DEFAULT_HASH_MODEL: &str = "feature-hash-v1";

pub struct HashProvider {
    model: String,
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            model: DEFAULT_HASH_MODEL.to_string(),
            dims: dims.max(1),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let mut provider = Self::new(config.dims.unwrap_or(DEFAULT_HASH_DIMS));
        if let Some(model) = &config.model {
            provider.model = model.clone();
        }
        provider
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();

        for token in lowered.split_whitespace() {
            self.add_feature(&mut v, token.as_bytes(), 1.0);
            let chars: Vec<char> = token.chars().filter(|c| c.is_alphanumeric()).collect();
            for pair in chars.windows(2) {
                let feature: String = pair.iter().collect();
                self.add_feature(&mut v, feature.as_bytes(), 0.5);
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], bytes: &[u8], weight: f32) {
        let h = fnv1a(bytes);
        let bucket = (h % self.dims as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
