//! Structure-preserving manual chunker.
//!
//! Splits a [`Manual`] into [`Chunk`]s: the goal first, then one chunk per
//! procedure step (label and details together), then one chunk per
//! precaution. Blank text never produces a chunk.
//!
//! Chunks are persisted in a canonical compact JSON form (see
//! [`Chunk::to_canonical`]) and hashed with SHA-256 so an unchanged chunk can
//! be recognised on re-index.

use sha2::{Digest, Sha256};

use crate::manual::normalize_text;
use crate::models::{Chunk, Manual, ProcedureStep};

/// Decompose a manual into ordered chunks. Total: never fails.
pub fn chunk_manual(manual: &Manual) -> Vec<Chunk> {
    let mut chunks = Vec::with_capacity(1 + manual.procedure.len() + manual.precaution.len());

    if let Some(goal) = manual.goal.as_deref().map(normalize_text) {
        if !goal.is_empty() {
            chunks.push(Chunk::Goal(goal));
        }
    }

    for step in &manual.procedure {
        let label = normalize_text(&step.step);
        let details: Vec<String> = step
            .details
            .iter()
            .map(|d| normalize_text(d))
            .filter(|d| !d.is_empty())
            .collect();
        if label.is_empty() && details.is_empty() {
            continue;
        }
        chunks.push(Chunk::Procedure(ProcedureStep {
            step: label,
            details,
        }));
    }

    for item in &manual.precaution {
        let item = normalize_text(item);
        if !item.is_empty() {
            chunks.push(Chunk::Precaution(item));
        }
    }

    chunks
}

impl Chunk {
    /// The chunk's type tag as stored alongside the record.
    pub fn kind(&self) -> &'static str {
        match self {
            Chunk::Goal(_) => "goal",
            Chunk::Procedure(_) => "procedure",
            Chunk::Precaution(_) => "precaution",
            Chunk::Text(_) => "text",
        }
    }

    /// Canonical compact JSON encoding; this is the text that gets embedded.
    pub fn to_canonical(&self) -> String {
        // Serializing a tree of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse stored content back into a chunk.
    pub fn parse_stored(content: &str) -> Result<Chunk, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Like [`Chunk::parse_stored`], but content written in the older
    /// unstructured format is wrapped as [`Chunk::Text`].
    pub fn from_stored(content: &str) -> Chunk {
        match Self::parse_stored(content) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "stored chunk is not structured; using raw text");
                Chunk::Text(content.to_string())
            }
        }
    }

    /// Plain-text rendering for prompt interpolation and CLI output.
    pub fn render(&self) -> String {
        match self {
            Chunk::Goal(s) | Chunk::Precaution(s) | Chunk::Text(s) => s.clone(),
            Chunk::Procedure(p) if p.details.is_empty() => p.step.clone(),
            Chunk::Procedure(p) => format!("{}\n- {}", p.step, p.details.join("\n- ")),
        }
    }
}

/// SHA-256 of the canonical content, hex-encoded.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manual() -> Manual {
        Manual {
            title: Some("인사 교육".to_string()),
            goal: Some("손님을 밝게 맞이하기".to_string()),
            procedure: vec![
                ProcedureStep {
                    step: "1. 인사".to_string(),
                    details: vec!["밝게 인사하기".to_string()],
                },
                ProcedureStep {
                    step: "2. 주문".to_string(),
                    details: vec!["HOT/ICE 확인".to_string(), "사이즈 확인".to_string()],
                },
            ],
            precaution: vec!["손님 말 끊지 않기".to_string(), "금액 확인".to_string()],
        }
    }

    #[test]
    fn test_full_manual_count_and_order() {
        let chunks = chunk_manual(&sample_manual());
        assert_eq!(chunks.len(), 1 + 2 + 2);
        let kinds: Vec<&str> = chunks.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec!["goal", "procedure", "procedure", "precaution", "precaution"]
        );
        assert_eq!(chunks[2].render(), "2. 주문\n- HOT/ICE 확인\n- 사이즈 확인");
        assert_eq!(chunks[4], Chunk::Precaution("금액 확인".to_string()));
    }

    #[test]
    fn test_empty_manual_yields_nothing() {
        assert!(chunk_manual(&Manual::default()).is_empty());
    }

    #[test]
    fn test_blank_content_excluded() {
        let manual = Manual {
            title: None,
            goal: Some("   ".to_string()),
            procedure: vec![
                ProcedureStep {
                    step: " ".to_string(),
                    details: vec!["".to_string()],
                },
                ProcedureStep {
                    step: "".to_string(),
                    details: vec!["  세부  사항 ".to_string(), " ".to_string()],
                },
            ],
            precaution: vec!["\n\t".to_string()],
        };
        let chunks = chunk_manual(&manual);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0],
            Chunk::Procedure(ProcedureStep {
                step: String::new(),
                details: vec!["세부 사항".to_string()],
            })
        );
        for c in &chunks {
            assert!(!c.render().trim().is_empty());
        }
    }

    #[test]
    fn test_canonical_form_is_compact_and_structured() {
        let chunk = Chunk::Procedure(ProcedureStep {
            step: "1. 인사".to_string(),
            details: vec!["밝게 인사하기".to_string()],
        });
        assert_eq!(
            chunk.to_canonical(),
            r#"{"type":"procedure","content":{"step":"1. 인사","details":["밝게 인사하기"]}}"#
        );
        assert_eq!(Chunk::from_stored(&chunk.to_canonical()), chunk);
    }

    #[test]
    fn test_unstructured_content_falls_back_to_text() {
        let chunk = Chunk::from_stored("손님 오면 바로 인사하기");
        assert_eq!(chunk, Chunk::Text("손님 오면 바로 인사하기".to_string()));
        assert!(Chunk::parse_stored("손님 오면 바로 인사하기").is_err());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let c = Chunk::Goal("목표".to_string()).to_canonical();
        assert_eq!(content_hash(&c), content_hash(&c));
        assert_ne!(content_hash(&c), content_hash("다른 내용"));
        assert_eq!(content_hash(&c).len(), 64);
    }
}
