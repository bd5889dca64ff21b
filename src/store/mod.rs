//! Storage context for reference data, raw records and summary snapshots.
//!
//! Every collection is append-only: records and summaries are written whole and
//! never updated in place, so a reader running alongside ingestion always sees
//! a consistent (if incomplete) snapshot.

pub mod jsonl;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Instrument, RecordKind, SentimentRecord, SentimentSource, SentimentSummary};

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait SentimentStore: Send + Sync {
    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError>;
    async fn insert_instruments(&self, items: &[Instrument]) -> Result<(), StoreError>;

    async fn sources(&self) -> Result<Vec<SentimentSource>, StoreError>;
    async fn insert_sources(&self, items: &[SentimentSource]) -> Result<(), StoreError>;

    async fn append_record(&self, record: &SentimentRecord) -> Result<(), StoreError>;
    async fn records(&self, kind: RecordKind) -> Result<Vec<SentimentRecord>, StoreError>;

    async fn append_summary(&self, summary: &SentimentSummary) -> Result<(), StoreError>;
    async fn summaries(&self) -> Result<Vec<SentimentSummary>, StoreError>;

    /// Most recent `limit` summaries, newest first.
    async fn latest_summaries(&self, limit: usize) -> Result<Vec<SentimentSummary>, StoreError> {
        let mut all = self.summaries().await?;
        // Stable sort keeps append order among equal timestamps; reverse for newest-first.
        all.sort_by_key(|s| s.computed_at);
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }
}
