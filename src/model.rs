//! Core records shared by ingestion, aggregation and the query API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exchange listing state. Anything that isn't `Open` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstrumentState {
    Open,
    Other(String),
}

impl From<String> for InstrumentState {
    fn from(s: String) -> Self {
        if s == "Open" {
            InstrumentState::Open
        } else {
            InstrumentState::Other(s)
        }
    }
}

impl From<InstrumentState> for String {
    fn from(s: InstrumentState) -> Self {
        match s {
            InstrumentState::Open => "Open".to_string(),
            InstrumentState::Other(s) => s,
        }
    }
}

/// Tradable symbol reference, synced once from the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    #[serde(default)]
    pub root_symbol: Option<String>,
    pub state: InstrumentState,
}

impl Instrument {
    /// True when the symbol ends in one of the given quote suffixes (e.g. `USDT`).
    pub fn is_quoted_in(&self, suffixes: &[String]) -> bool {
        suffixes.iter().any(|s| self.symbol.ends_with(s.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SocialSearch,
    NewsFeed,
}

/// A configured provider of text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentSource {
    pub source_id: String,
    pub display_name: String,
    /// Feed URL, or a query template for social search.
    pub endpoint: String,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Social,
    News,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Social => "social",
            RecordKind::News => "news",
        }
    }
}

/// One scored unit of text. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    /// Instrument symbol for social posts, source display name for news.
    pub subject_key: String,
    pub kind: RecordKind,
    pub text: String,
    /// Compound score in [-1, 1].
    pub score: f64,
    pub observed_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Point-in-time mean score for one (kind, subject_key) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub kind: RecordKind,
    pub subject_key: String,
    pub avg_score: f64,
    pub sample_count: usize,
    pub computed_at: DateTime<Utc>,
}

/// One trade print from the exchange, passed through to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    pub price: f64,
}
