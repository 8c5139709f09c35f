//! Tone classification for manual authoring hints.
//!
//! A free-text tone description ("밝게 화이팅!", "~하이소") maps to one of a
//! closed set of [`Tone`]s. Rules are evaluated in a fixed order and the
//! first category with a matching keyword wins, so a text mixing polite
//! endings with dialect is classified as formal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Dialect,
    Casual,
    Friendly,
    Expressive,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Dialect => "dialect",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Expressive => "expressive",
            Tone::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Rule {
    tone: Tone,
    keywords: &'static [&'static str],
}

/// Evaluated top to bottom.
const RULES: &[Rule] = &[
    Rule {
        tone: Tone::Formal,
        keywords: &[
            "십시오", "하세요", "하십니다", "입니다", "습니다", "주시기", "부탁드립니다",
            "해주세요", "되시길", "감사합니다", "바랍니다", "드리겠습니다", "예요", "세요",
        ],
    },
    Rule {
        tone: Tone::Dialect,
        keywords: &[
            "하이소", "데이", "카이", "마이", "이라", "믄", "하모", "하제", "하니껴", "혀",
            "하잉", "허이", "아입니까", "요래", "그라지", "맞나", "하이까", "오이", "카나",
        ],
    },
    Rule {
        tone: Tone::Casual,
        keywords: &[
            "해", "하자", "해야지", "하네", "하니", "라구", "자", "야지", "했지", "했잖아",
            "하거라", "봐라", "해야겠다", "할게", "할래", "하자꾸나", "하자고", "하라니까",
        ],
    },
    Rule {
        tone: Tone::Friendly,
        keywords: &[
            "요~", "죠~", "아~", "ㅎㅎ", "ㅋㅋ", "^^", "말이야", "있잖아", "같아", "하거든",
            "할 수 있겠지?", "그치?", "좋지?", "느낌이야", "그럼~", "그렇게 해보자~",
        ],
    },
    Rule {
        tone: Tone::Expressive,
        keywords: &[
            "화이팅", "가보자", "좋구만", "좋다~", "멋지다", "좋아~", "열심히", "힘내자",
            "아자", "가자", "오늘도", "즐겁게", "밝게", "기분좋게",
        ],
    },
];

/// Classify a tone description. Empty or unmatched text is [`Tone::Neutral`].
pub fn classify_tone(text: &str) -> Tone {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Tone::Neutral;
    }
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
        .map(|rule| rule.tone)
        .unwrap_or(Tone::Neutral)
}
