// src/ingest/types.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SourceError;
use crate::model::{RecordKind, SentimentRecord, SentimentSource};
use crate::sentiment;

/// Provider item before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub subject_key: String,
    /// Already concatenated and normalized text.
    pub text: String,
    /// Authorship/publication time as reported by the provider, if any.
    pub observed_at: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

/// One independent unit of work for an adapter within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Social search for an instrument symbol.
    Instrument(String),
    /// A configured feed.
    Source(SentimentSource),
}

impl Target {
    /// Short label for logs and reports.
    pub fn label(&self) -> &str {
        match self {
            Target::Instrument(s) => s,
            Target::Source(s) => &s.display_name,
        }
    }
}

/// Reference data an adapter picks its targets from.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    /// Quote-filtered symbols, in store order.
    pub symbols: Vec<String>,
    pub sources: Vec<SentimentSource>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> RecordKind;

    /// Targets this adapter will fetch in a cycle, in fetch order.
    fn targets(&self, set: &TargetSet) -> Vec<Target>;

    async fn fetch_candidates(&self, target: &Target) -> Result<Vec<RawItem>, SourceError>;

    /// Score an item and stamp provenance.
    fn to_record(&self, item: RawItem, ingested_at: DateTime<Utc>) -> SentimentRecord {
        let score = sentiment::score(&item.text);
        SentimentRecord {
            subject_key: item.subject_key,
            kind: self.kind(),
            text: item.text,
            score,
            observed_at: item.observed_at.unwrap_or(ingested_at),
            ingested_at,
            link: item.link,
        }
    }
}
