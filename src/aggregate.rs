//! # Aggregation
//! Groups raw records by `(kind, subject_key)` and appends one mean-score
//! snapshot per group.
//!
//! Grouping is exact: `BTCUSDT` and `btcusdt` are different keys. By default
//! the mean covers every record ever stored for the key; an optional window
//! restricts it to records observed within the last `window`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};

use crate::error::StoreError;
use crate::model::{RecordKind, SentimentRecord, SentimentSummary};
use crate::store::SentimentStore;

/// Pure grouping step. Output is ordered by kind, then key.
pub fn summarize(
    records: &[SentimentRecord],
    now: DateTime<Utc>,
    window: Option<Duration>,
) -> Vec<SentimentSummary> {
    let cutoff = window
        .and_then(|w| chrono::Duration::from_std(w).ok())
        .map(|w| now - w);

    let mut groups: BTreeMap<(RecordKind, &str), (f64, usize)> = BTreeMap::new();
    for r in records {
        if let Some(c) = cutoff {
            if r.observed_at < c {
                continue;
            }
        }
        if !r.score.is_finite() {
            continue;
        }
        let e = groups.entry((r.kind, r.subject_key.as_str())).or_insert((0.0, 0));
        e.0 += r.score;
        e.1 += 1;
    }

    groups
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|((kind, key), (sum, n))| SentimentSummary {
            kind,
            subject_key: key.to_string(),
            avg_score: sum / n as f64,
            sample_count: n,
            computed_at: now,
        })
        .collect()
}

/// Reads raw records, appends summary snapshots.
pub struct Aggregator {
    store: Arc<dyn SentimentStore>,
    window: Option<Duration>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn SentimentStore>) -> Self {
        Self {
            store,
            window: None,
        }
    }

    pub fn with_window(mut self, window: Option<Duration>) -> Self {
        self.window = window;
        self
    }

    pub async fn run(&self) -> Result<Vec<SentimentSummary>, StoreError> {
        self.compute_summaries(Utc::now()).await
    }

    /// Compute and append one snapshot per non-empty group, stamped `now`.
    pub async fn compute_summaries(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SentimentSummary>, StoreError> {
        let mut records = self.store.records(RecordKind::Social).await?;
        records.extend(self.store.records(RecordKind::News).await?);

        let summaries = summarize(&records, now, self.window);
        for s in &summaries {
            self.store.append_summary(s).await?;
        }

        counter!("aggregate_summaries_total").increment(summaries.len() as u64);
        gauge!("aggregate_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(
            target: "aggregate",
            records = records.len(),
            summaries = summaries.len(),
            "summaries computed"
        );
        Ok(summaries)
    }
}
