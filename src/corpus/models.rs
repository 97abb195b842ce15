// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the pipeline. They're separate from
// the database queries so analysis modules can use them without depending on
// rusqlite directly.
//
// Category lists and per-category topic maps are stored as JSON text. The
// encode/decode functions below are the only code that touches that encoding;
// everything else works with `Vec<String>` and `BTreeMap`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Sentiment assigned upstream to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Parse a stored label. Unknown labels map to `None` rather than erroring,
    /// so a corrupt row degrades to "no sentiment" instead of aborting a load.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "positive" | "positivo" => Some(Sentiment::Positive),
            "neutral" | "neutro" => Some(Sentiment::Neutral),
            "negative" | "negativo" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subjectivity class assigned upstream. "Mixed" reviews blend opinion with
/// concrete detail and are the preferred sampling pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subjectivity {
    Subjective,
    Mixed,
}

impl Subjectivity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "subjective" | "subjetivo" => Some(Subjectivity::Subjective),
            "mixed" | "mixto" => Some(Subjectivity::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subjectivity::Subjective => "Subjective",
            Subjectivity::Mixed => "Mixed",
        }
    }
}

impl std::fmt::Display for Subjectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A review as loaded from the corpus, with whatever upstream annotations it
/// carries. `topics` maps a category name to the topic label discovered for
/// this review within that category.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub id: i64,
    pub text: String,
    pub stay_date: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub subjectivity: Option<Subjectivity>,
    pub categories: Vec<String>,
    pub topics: BTreeMap<String, String>,
}

/// A review being imported. The id is optional; SQLite assigns one when the
/// source file doesn't carry its own.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub id: Option<i64>,
    pub text: String,
    pub stay_date: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub subjectivity: Option<Subjectivity>,
    pub categories: Vec<String>,
}

/// Per-review relevance scores from the upstream category classifier, keyed by
/// category name. A BTreeMap keeps iteration (and therefore argmax tie-breaks)
/// deterministic.
pub type CategoryScores = BTreeMap<String, f64>;

/// One row of the representative sample: a single review chosen to stand for
/// a (sentiment, category, topic) group.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentativeReview {
    pub review_id: i64,
    pub sentiment: Sentiment,
    pub category: String,
    pub topic: String,
    pub text: String,
}

/// Encode a category list for storage: always a JSON array of strings.
pub fn encode_categories(categories: &[String]) -> String {
    serde_json::to_string(categories).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a stored category list. Accepts the JSON array this crate writes,
/// plus plain comma-separated text from older exports. Anything unparseable
/// decodes to an empty list. Duplicates collapse to the first occurrence so
/// the result behaves as an ordered set.
pub fn decode_categories(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let parsed: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).unwrap_or_default()
    } else {
        trimmed.split(',').map(|s| s.to_string()).collect()
    };
    let mut seen = Vec::new();
    for name in parsed {
        let name = name.trim().to_string();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Encode a category → topic map for storage as a JSON object.
pub fn encode_topic_map(topics: &BTreeMap<String, String>) -> String {
    serde_json::to_string(topics).unwrap_or_else(|_| "{}".to_string())
}

/// Decode a stored topic map. Malformed input decodes to an empty map, which
/// downstream consumers treat the same as "no topics assigned yet".
pub fn decode_topic_map(raw: &str) -> BTreeMap<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(trimmed).unwrap_or_default()
}
