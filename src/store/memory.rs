//! In-process store used by tests and ephemeral runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::SentimentStore;
use crate::error::StoreError;
use crate::model::{Instrument, RecordKind, SentimentRecord, SentimentSource, SentimentSummary};

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    instruments: Vec<Instrument>,
    sources: Vec<SentimentSource>,
    social: Vec<SentimentRecord>,
    news: Vec<SentimentRecord>,
    summaries: Vec<SentimentSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T, StoreError> {
        let mut g = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut g))
    }
}

#[async_trait]
impl SentimentStore for MemoryStore {
    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        self.with(|i| i.instruments.clone())
    }

    async fn insert_instruments(&self, items: &[Instrument]) -> Result<(), StoreError> {
        self.with(|i| i.instruments.extend_from_slice(items))
    }

    async fn sources(&self) -> Result<Vec<SentimentSource>, StoreError> {
        self.with(|i| i.sources.clone())
    }

    async fn insert_sources(&self, items: &[SentimentSource]) -> Result<(), StoreError> {
        self.with(|i| i.sources.extend_from_slice(items))
    }

    async fn append_record(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        self.with(|i| match record.kind {
            RecordKind::Social => i.social.push(record.clone()),
            RecordKind::News => i.news.push(record.clone()),
        })
    }

    async fn records(&self, kind: RecordKind) -> Result<Vec<SentimentRecord>, StoreError> {
        self.with(|i| match kind {
            RecordKind::Social => i.social.clone(),
            RecordKind::News => i.news.clone(),
        })
    }

    async fn append_summary(&self, summary: &SentimentSummary) -> Result<(), StoreError> {
        self.with(|i| i.summaries.push(summary.clone()))
    }

    async fn summaries(&self) -> Result<Vec<SentimentSummary>, StoreError> {
        self.with(|i| i.summaries.clone())
    }
}
