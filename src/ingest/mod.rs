// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorClass;
use crate::ingest::types::{SourceAdapter, Target, TargetSet};
use crate::store::SentimentStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_records_fetched_total",
            "Raw items returned by providers."
        );
        describe_counter!(
            "ingest_records_persisted_total",
            "Scored records written to the raw store."
        );
        describe_counter!(
            "ingest_target_errors_total",
            "Targets that failed within a cycle, by error class."
        );
        describe_histogram!("ingest_fetch_ms", "Per-target fetch time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("ingest_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)</?[a-z!][^>]*>").expect("static tag regex")
    });
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Curly quotes to ASCII so contractions tokenize
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Short, stable id for a text so logs never carry raw content.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetResult {
    Succeeded {
        fetched: usize,
        persisted: usize,
    },
    Failed {
        class: ErrorClass,
        message: String,
        fetched: usize,
        persisted: usize,
    },
}

/// Outcome for one (adapter, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetOutcome {
    pub adapter: String,
    pub target: String,
    #[serde(flatten)]
    pub result: TargetResult,
}

impl TargetOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.result, TargetResult::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub persisted: usize,
    pub cancelled: bool,
    pub outcomes: Vec<TargetOutcome>,
}

impl IngestionReport {
    pub fn failures(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

/// Fans out over adapters and their targets, isolating each target's failure.
pub struct IngestionPipeline {
    store: Arc<dyn SentimentStore>,
    adapters: Vec<Box<dyn SourceAdapter>>,
    quote_suffixes: Vec<String>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn SentimentStore>, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self {
            store,
            adapters,
            quote_suffixes: vec!["USDT".into(), "USD".into()],
        }
    }

    pub fn with_quote_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.quote_suffixes = suffixes;
        self
    }

    /// Reference data for this cycle. Load failures become report entries.
    async fn load_targets(&self, outcomes: &mut Vec<TargetOutcome>) -> TargetSet {
        let mut set = TargetSet::default();

        match self.store.instruments().await {
            Ok(list) => {
                set.symbols = list
                    .into_iter()
                    .filter(|i| i.is_quoted_in(&self.quote_suffixes))
                    .map(|i| i.symbol)
                    .collect();
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "loading instruments failed");
                outcomes.push(reference_failure("instruments", &e.to_string()));
            }
        }

        match self.store.sources().await {
            Ok(list) => set.sources = list,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "loading sources failed");
                outcomes.push(reference_failure("sources", &e.to_string()));
            }
        }

        set
    }

    /// Run one cycle. Never fails; partial results are reported.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> IngestionReport {
        ensure_metrics_described();
        let started_at = Utc::now();

        let mut outcomes = Vec::new();
        let set = self.load_targets(&mut outcomes).await;

        let mut cancelled = false;
        'adapters: for adapter in &self.adapters {
            for target in adapter.targets(&set) {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'adapters;
                }
                let outcome = self.run_target(adapter.as_ref(), &target).await;
                outcomes.push(outcome);
            }
        }

        let (fetched, persisted) = outcomes.iter().fold((0, 0), |(f, p), o| match o.result {
            TargetResult::Succeeded { fetched, persisted }
            | TargetResult::Failed {
                fetched, persisted, ..
            } => (f + fetched, p + persisted),
        });

        let finished_at = Utc::now();
        gauge!("ingest_last_cycle_ts").set(finished_at.timestamp() as f64);

        let report = IngestionReport {
            started_at,
            finished_at,
            fetched,
            persisted,
            cancelled,
            outcomes,
        };

        tracing::info!(
            target: "ingest",
            fetched = report.fetched,
            persisted = report.persisted,
            failures = report.failures().count(),
            cancelled = report.cancelled,
            "ingestion cycle finished"
        );
        report
    }

    async fn run_target(&self, adapter: &dyn SourceAdapter, target: &Target) -> TargetOutcome {
        let adapter_name = adapter.name().to_string();
        let label = target.label().to_string();
        let outcome = |result| TargetOutcome {
            adapter: adapter_name.clone(),
            target: label.clone(),
            result,
        };

        let t0 = std::time::Instant::now();
        let fetched_items = adapter.fetch_candidates(target).await;
        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let items = match fetched_items {
            Ok(items) => items,
            Err(e) => {
                let class = e.class();
                tracing::warn!(
                    target: "ingest",
                    adapter = adapter.name(),
                    target_key = %label,
                    class = class.as_str(),
                    error = %e,
                    "target skipped"
                );
                counter!("ingest_target_errors_total", "class" => class.as_str()).increment(1);
                return outcome(TargetResult::Failed {
                    class,
                    message: e.to_string(),
                    fetched: 0,
                    persisted: 0,
                });
            }
        };

        let fetched = items.len();
        counter!("ingest_records_fetched_total").increment(fetched as u64);

        let ingested_at = Utc::now();
        let mut persisted = 0usize;
        for item in items {
            let record = adapter.to_record(item, ingested_at);
            if let Err(e) = self.store.append_record(&record).await {
                tracing::warn!(
                    target: "ingest",
                    adapter = adapter.name(),
                    target_key = %label,
                    error = %e,
                    "persist failed, abandoning target"
                );
                counter!("ingest_records_persisted_total").increment(persisted as u64);
                counter!("ingest_target_errors_total", "class" => ErrorClass::Storage.as_str())
                    .increment(1);
                return outcome(TargetResult::Failed {
                    class: ErrorClass::Storage,
                    message: e.to_string(),
                    fetched,
                    persisted,
                });
            }
            tracing::debug!(
                target: "ingest",
                id = %anon_hash(&record.text),
                subject = %record.subject_key,
                score = record.score,
                "record persisted"
            );
            persisted += 1;
        }

        counter!("ingest_records_persisted_total").increment(persisted as u64);
        outcome(TargetResult::Succeeded { fetched, persisted })
    }
}

fn reference_failure(what: &str, message: &str) -> TargetOutcome {
    counter!("ingest_target_errors_total", "class" => ErrorClass::Storage.as_str()).increment(1);
    TargetOutcome {
        adapter: "reference".to_string(),
        target: what.to_string(),
        result: TargetResult::Failed {
            class: ErrorClass::Storage,
            message: message.to_string(),
            fetched: 0,
            persisted: 0,
        },
    }
}
