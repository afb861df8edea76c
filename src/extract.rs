// src/extract.rs
//! Tolerant extraction of JSON fragments from free-form oracle output.
//!
//! The oracle is instructed to return only JSON but routinely wraps it in
//! commentary. We scan for the outermost fragment of the expected shape,
//! parse it, and validate fields. Article extraction is strict (no article,
//! no run); mention extraction degrades to an empty list.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON fragment of the expected shape in oracle output")]
    MissingFragment,
    #[error("JSON fragment failed to parse")]
    ParseFailure(#[source] serde_json::Error),
    #[error("required field missing or invalid: {0}")]
    SchemaViolation(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

/// Newest-article reference as reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    pub published_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stance {
    Buy,
    Sell,
    Ignore,
    /// Anything the oracle emitted that we did not recognize; shown verbatim.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Other(String),
}

impl Stance {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "买入" | "BUY" | "buy" | "Buy" => Stance::Buy,
            "卖出" | "SELL" | "sell" | "Sell" => Stance::Sell,
            "忽略" | "IGNORE" | "ignore" | "Ignore" => Stance::Ignore,
            other => Stance::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Stance::Buy => "买入",
            Stance::Sell => "卖出",
            Stance::Ignore => "忽略",
            Stance::Other(s) => s,
        }
    }
}

impl Sentiment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "正面" | "POSITIVE" | "positive" | "Positive" => Sentiment::Positive,
            "负面" | "NEGATIVE" | "negative" | "Negative" => Sentiment::Negative,
            "中性" | "NEUTRAL" | "neutral" | "Neutral" => Sentiment::Neutral,
            other => Sentiment::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Sentiment::Positive => "正面",
            Sentiment::Negative => "负面",
            Sentiment::Neutral => "中性",
            Sentiment::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One company mentioned by the article, with the author's stance toward it.
/// Duplicate companies are kept as-is; the oracle decides what to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub company: String,
    pub stance: Stance,
    pub sentiment: Sentiment,
}

/// Slice from the first outer opening delimiter to the last outer closing
/// delimiter of `shape`. A non-greedy scan is not enough: the oracle may emit
/// commentary containing braces, so we anchor on first-open/last-close.
pub fn fragment(text: &str, shape: Shape) -> Option<&str> {
    let (open, close) = match shape {
        Shape::Object => ('{', '}'),
        Shape::Array => ('[', ']'),
    };
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    // `close` is ASCII, so `end` is the last byte of the fragment.
    Some(&text[start..=end])
}

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw.trim(), f).ok())
}

/// Strict extraction of the newest-article object. All failures are fatal to
/// the run: the caller must not fabricate a synthetic article.
pub fn latest_article(raw: &str) -> Result<ArticleRef, ExtractionError> {
    let frag = fragment(raw, Shape::Object).ok_or_else(|| {
        warn!(raw, "no JSON object in locate-latest oracle output");
        ExtractionError::MissingFragment
    })?;

    let value: serde_json::Value = serde_json::from_str(frag).map_err(|e| {
        warn!(raw, error = %e, "locate-latest fragment did not parse");
        ExtractionError::ParseFailure(e)
    })?;

    let field = |name: &'static str| -> Result<String, ExtractionError> {
        value
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(ExtractionError::SchemaViolation(name))
    };

    let title = field("title")?;
    let url = field("url")?;
    let time = field("time")?;
    let published_at = parse_time(&time).ok_or_else(|| {
        warn!(raw, time, "article time string did not parse");
        ExtractionError::SchemaViolation("time")
    })?;

    Ok(ArticleRef {
        title,
        url,
        published_at,
    })
}

fn string_field(obj: &serde_json::Map<String, serde_json::Value>, name: &str) -> String {
    obj.get(name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Lenient extraction of the mentions array. Anything unusable degrades to an
/// empty list so the article notification still goes out.
pub fn entity_mentions(raw: &str) -> Vec<EntityMention> {
    let Some(frag) = fragment(raw, Shape::Array) else {
        warn!(raw, "no JSON array in mentions oracle output");
        return Vec::new();
    };

    let value: serde_json::Value = match serde_json::from_str(frag) {
        Ok(v) => v,
        Err(e) => {
            warn!(raw, error = %e, "mentions fragment did not parse");
            return Vec::new();
        }
    };

    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::Object(obj) => {
                out.push(EntityMention {
                    company: string_field(obj, "company"),
                    stance: Stance::parse(&string_field(obj, "stance")),
                    sentiment: Sentiment::parse(&string_field(obj, "sentiment")),
                });
            }
            // Bare company name without stance/sentiment.
            serde_json::Value::String(s) => {
                out.push(EntityMention {
                    company: s.clone(),
                    stance: Stance::Other(String::new()),
                    sentiment: Sentiment::Other(String::new()),
                });
            }
            other => {
                warn!(element = %other, "skipping non-object mention element");
            }
        }
    }
    out
}
