//! Append-only JSON Lines store.
//!
//! One file per collection under the data directory. Each line is a complete
//! JSON document, so a crash mid-write loses at most the line being written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::SentimentStore;
use crate::error::StoreError;
use crate::model::{Instrument, RecordKind, SentimentRecord, SentimentSource, SentimentSummary};

const INSTRUMENTS: &str = "instruments.jsonl";
const SOURCES: &str = "sources.jsonl";
const SOCIAL_RECORDS: &str = "social_records.jsonl";
const NEWS_RECORDS: &str = "news_records.jsonl";
const SUMMARIES: &str = "summaries.jsonl";

#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn records_file(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Social => SOCIAL_RECORDS,
            RecordKind::News => NEWS_RECORDS,
        }
    }

    async fn append<T: Serialize + Sync>(&self, file: &str, items: &[T]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for it in items {
            buf.push_str(&serde_json::to_string(it)?);
            buf.push('\n');
        }

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
            .await?;
        f.write_all(buf.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(v) => out.push(v),
                Err(e) => {
                    tracing::warn!(
                        target: "store",
                        file = %path.display(),
                        error = %e,
                        "skipping malformed line"
                    );
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SentimentStore for JsonlStore {
    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        self.load(INSTRUMENTS).await
    }

    async fn insert_instruments(&self, items: &[Instrument]) -> Result<(), StoreError> {
        self.append(INSTRUMENTS, items).await
    }

    async fn sources(&self) -> Result<Vec<SentimentSource>, StoreError> {
        self.load(SOURCES).await
    }

    async fn insert_sources(&self, items: &[SentimentSource]) -> Result<(), StoreError> {
        self.append(SOURCES, items).await
    }

    async fn append_record(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        self.append(Self::records_file(record.kind), std::slice::from_ref(record))
            .await
    }

    async fn records(&self, kind: RecordKind) -> Result<Vec<SentimentRecord>, StoreError> {
        self.load(Self::records_file(kind)).await
    }

    async fn append_summary(&self, summary: &SentimentSummary) -> Result<(), StoreError> {
        self.append(SUMMARIES, std::slice::from_ref(summary)).await
    }

    async fn summaries(&self) -> Result<Vec<SentimentSummary>, StoreError> {
        self.load(SUMMARIES).await
    }
}
