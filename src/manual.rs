//! Lenient conversion of loosely-shaped manual JSON into a [`Manual`].
//!
//! Manuals come from a model-authored JSON document, so fields drift: a goal
//! may arrive as a list, precautions as a single string, procedure entries as
//! bare strings. Conversion never fails; fields that cannot be interpreted
//! are dropped.

use serde_json::Value;

use crate::models::{Manual, ProcedureStep};

impl Manual {
    /// Coerce an arbitrary JSON value into a manual.
    ///
    /// A JSON string containing an encoded object is decoded first, which
    /// covers snapshots stored as raw model responses.
    pub fn from_json(value: &Value) -> Manual {
        match value {
            Value::Object(_) => Manual {
                title: value.get("title").and_then(text_of),
                goal: value.get("goal").and_then(text_of),
                procedure: value.get("procedure").map(steps_of).unwrap_or_default(),
                precaution: value.get("precaution").map(list_of).unwrap_or_default(),
            },
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(inner @ Value::Object(_)) => Manual::from_json(&inner),
                _ => Manual::default(),
            },
            _ => Manual::default(),
        }
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => normalize_text(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text_of)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn list_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        other => text_of(other).into_iter().collect(),
    }
}

fn step_of(value: &Value) -> Option<ProcedureStep> {
    match value {
        Value::Object(_) => {
            let step = value.get("step").and_then(text_of).unwrap_or_default();
            let details = value.get("details").map(list_of).unwrap_or_default();
            if step.is_empty() && details.is_empty() {
                None
            } else {
                Some(ProcedureStep { step, details })
            }
        }
        Value::Array(_) => None,
        other => text_of(other).map(|step| ProcedureStep {
            step,
            details: Vec::new(),
        }),
    }
}

fn steps_of(value: &Value) -> Vec<ProcedureStep> {
    match value {
        Value::Array(items) => items.iter().filter_map(step_of).collect(),
        other => step_of(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_manual() {
        let m = Manual::from_json(&json!({
            "title": "주문받고 결제하는 기본 교육",
            "goal": "손님이 기분 좋게 주문하기",
            "procedure": [
                {"step": "1. 인사", "details": ["밝게 인사하기", "눈 맞추기"]},
                {"step": "2. 주문", "details": ["HOT/ICE 확인"]}
            ],
            "precaution": ["손님 말 끊지 않기"]
        }));
        assert_eq!(m.title.as_deref(), Some("주문받고 결제하는 기본 교육"));
        assert_eq!(m.goal.as_deref(), Some("손님이 기분 좋게 주문하기"));
        assert_eq!(m.procedure.len(), 2);
        assert_eq!(m.procedure[0].details, vec!["밝게 인사하기", "눈 맞추기"]);
        assert_eq!(m.precaution, vec!["손님 말 끊지 않기"]);
    }

    #[test]
    fn test_goal_list_is_joined() {
        let m = Manual::from_json(&json!({"goal": ["친절", "정확"]}));
        assert_eq!(m.goal.as_deref(), Some("친절, 정확"));
    }

    #[test]
    fn test_precaution_string_becomes_list() {
        let m = Manual::from_json(&json!({"precaution": "결제 전 금액 확인"}));
        assert_eq!(m.precaution, vec!["결제 전 금액 확인"]);
    }

    #[test]
    fn test_plain_string_procedure_entries() {
        let m = Manual::from_json(&json!({"procedure": ["인사하기", {"step": "주문 받기"}, 3]}));
        assert_eq!(m.procedure.len(), 3);
        assert_eq!(m.procedure[0].step, "인사하기");
        assert!(m.procedure[0].details.is_empty());
        assert_eq!(m.procedure[2].step, "3");
    }

    #[test]
    fn test_details_string_becomes_list() {
        let m = Manual::from_json(&json!({"procedure": [{"step": "포장", "details": "봉투에 담기"}]}));
        assert_eq!(m.procedure[0].details, vec!["봉투에 담기"]);
    }

    #[test]
    fn test_missing_fields_and_blanks() {
        let m = Manual::from_json(&json!({
            "goal": "   ",
            "procedure": [{"step": " ", "details": ["", "  "]}, null],
            "precaution": ["", "  정리  정돈  "]
        }));
        assert_eq!(m.goal, None);
        assert!(m.procedure.is_empty());
        assert_eq!(m.precaution, vec!["정리 정돈"]);
    }

    #[test]
    fn test_encoded_string_snapshot() {
        let raw = json!({"goal": "목표"}).to_string();
        let m = Manual::from_json(&Value::String(raw));
        assert_eq!(m.goal.as_deref(), Some("목표"));
    }

    #[test]
    fn test_non_object_input() {
        assert_eq!(Manual::from_json(&json!(42)), Manual::default());
        assert_eq!(Manual::from_json(&json!("not json")), Manual::default());
        assert_eq!(Manual::from_json(&Value::Null), Manual::default());
    }
}
