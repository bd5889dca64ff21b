// tests/ingest_isolation.rs
//
// One failing target must never cost sibling targets their records.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crypto_sentiment_pipeline::error::{ErrorClass, SourceError, StoreError};
use crypto_sentiment_pipeline::ingest::providers::rss::{FixtureFeedFetcher, NewsFeedAdapter};
use crypto_sentiment_pipeline::ingest::types::{RawItem, SourceAdapter, Target, TargetSet};
use crypto_sentiment_pipeline::ingest::{IngestionPipeline, TargetResult};
use crypto_sentiment_pipeline::model::{
    Instrument, RecordKind, SentimentRecord, SentimentSource, SentimentSummary, SourceKind,
};
use crypto_sentiment_pipeline::store::{MemoryStore, SentimentStore};
use tokio_util::sync::CancellationToken;

const RSS_XML: &str = include_str!("fixtures/crypto_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/crypto_atom.xml");
const BROKEN_XML: &str = include_str!("fixtures/broken_feed.xml");

fn feed(name: &str, url: &str) -> SentimentSource {
    SentimentSource {
        source_id: name.to_lowercase(),
        display_name: name.to_string(),
        endpoint: url.to_string(),
        kind: SourceKind::NewsFeed,
    }
}

async fn store_with_feeds(feeds: &[SentimentSource]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_sources(feeds).await.unwrap();
    store
}

#[tokio::test]
async fn one_unreachable_feed_does_not_affect_the_other_two() {
    let feeds = [
        feed("Wire", "https://wire.test/rss"),
        feed("Down", "https://down.test/rss"),
        feed("Chain", "https://chain.test/atom"),
    ];
    let store = store_with_feeds(&feeds).await;
    let fetcher = FixtureFeedFetcher::new()
        .with_feed("https://wire.test/rss", RSS_XML)
        .with_feed("https://chain.test/atom", ATOM_XML);
    let pipeline = IngestionPipeline::new(
        store.clone(),
        vec![Box::new(NewsFeedAdapter::new(Arc::new(fetcher), 10))],
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.persisted, 3 + 2);
    assert!(!report.cancelled);

    let by_target = |name: &str| {
        report
            .outcomes
            .iter()
            .find(|o| o.target == name)
            .map(|o| o.result.clone())
            .unwrap()
    };
    assert_eq!(
        by_target("Wire"),
        TargetResult::Succeeded {
            fetched: 3,
            persisted: 3
        }
    );
    assert_eq!(
        by_target("Chain"),
        TargetResult::Succeeded {
            fetched: 2,
            persisted: 2
        }
    );
    assert!(matches!(
        by_target("Down"),
        TargetResult::Failed {
            class: ErrorClass::Transient,
            ..
        }
    ));

    let news = store.records(RecordKind::News).await.unwrap();
    assert_eq!(news.iter().filter(|r| r.subject_key == "Wire").count(), 3);
    assert_eq!(news.iter().filter(|r| r.subject_key == "Chain").count(), 2);
}

#[tokio::test]
async fn malformed_feed_is_reported_as_malformed() {
    let feeds = [
        feed("Wire", "https://wire.test/rss"),
        feed("Broken", "https://broken.test/rss"),
    ];
    let store = store_with_feeds(&feeds).await;
    let fetcher = FixtureFeedFetcher::new()
        .with_feed("https://wire.test/rss", RSS_XML)
        .with_feed("https://broken.test/rss", BROKEN_XML);
    let pipeline = IngestionPipeline::new(
        store.clone(),
        vec![Box::new(NewsFeedAdapter::new(Arc::new(fetcher), 10))],
    );

    let report = pipeline.run_cycle(&CancellationToken::new()).await;
    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target, "Broken");
    assert!(matches!(
        failed[0].result,
        TargetResult::Failed {
            class: ErrorClass::Malformed,
            ..
        }
    ));
    assert_eq!(report.persisted, 3);
}

/// Adapter that yields two items per source and fails on one source.
struct FlakyAdapter {
    fail_on: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for FlakyAdapter {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::News
    }

    fn targets(&self, set: &TargetSet) -> Vec<Target> {
        set.sources.iter().cloned().map(Target::Source).collect()
    }

    async fn fetch_candidates(&self, target: &Target) -> Result<Vec<RawItem>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target.label() == self.fail_on {
            return Err(SourceError::transient("flaky", "connection reset"));
        }
        Ok((0..2)
            .map(|i| RawItem {
                subject_key: target.label().to_string(),
                text: format!("good news {i}"),
                observed_at: None,
                link: None,
            })
            .collect())
    }
}

#[tokio::test]
async fn failing_first_target_still_runs_later_targets() {
    let feeds = [feed("A", "a"), feed("B", "b"), feed("C", "c")];
    let store = store_with_feeds(&feeds).await;
    let adapter = FlakyAdapter {
        fail_on: "A",
        calls: AtomicUsize::new(0),
    };
    let pipeline = IngestionPipeline::new(store.clone(), vec![Box::new(adapter)]);

    let report = pipeline.run_cycle(&CancellationToken::new()).await;
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.persisted, 4);
    assert_eq!(report.fetched, 4);
}

/// Store whose record appends fail for one subject key.
struct FailingStore {
    inner: MemoryStore,
    poison_key: &'static str,
}

#[async_trait]
impl SentimentStore for FailingStore {
    async fn instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        self.inner.instruments().await
    }
    async fn insert_instruments(&self, items: &[Instrument]) -> Result<(), StoreError> {
        self.inner.insert_instruments(items).await
    }
    async fn sources(&self) -> Result<Vec<SentimentSource>, StoreError> {
        self.inner.sources().await
    }
    async fn insert_sources(&self, items: &[SentimentSource]) -> Result<(), StoreError> {
        self.inner.insert_sources(items).await
    }
    async fn append_record(&self, record: &SentimentRecord) -> Result<(), StoreError> {
        if record.subject_key == self.poison_key {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.append_record(record).await
    }
    async fn records(&self, kind: RecordKind) -> Result<Vec<SentimentRecord>, StoreError> {
        self.inner.records(kind).await
    }
    async fn append_summary(&self, summary: &SentimentSummary) -> Result<(), StoreError> {
        self.inner.append_summary(summary).await
    }
    async fn summaries(&self) -> Result<Vec<SentimentSummary>, StoreError> {
        self.inner.summaries().await
    }
}

#[tokio::test]
async fn storage_error_aborts_only_that_target() {
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
        poison_key: "B",
    });
    store
        .insert_sources(&[feed("A", "a"), feed("B", "b"), feed("C", "c")])
        .await
        .unwrap();
    let adapter = FlakyAdapter {
        fail_on: "none",
        calls: AtomicUsize::new(0),
    };
    let pipeline = IngestionPipeline::new(store.clone(), vec![Box::new(adapter)]);

    let report = pipeline.run_cycle(&CancellationToken::new()).await;

    let b = report.outcomes.iter().find(|o| o.target == "B").unwrap();
    assert_eq!(
        b.result,
        TargetResult::Failed {
            class: ErrorClass::Storage,
            message: "storage io: disk full".to_string(),
            fetched: 2,
            persisted: 0,
        }
    );
    assert_eq!(report.persisted, 4);
    assert_eq!(report.fetched, 6);
}

#[tokio::test]
async fn cancelled_cycle_skips_remaining_targets() {
    let feeds = [feed("A", "a"), feed("B", "b")];
    let store = store_with_feeds(&feeds).await;
    let adapter = Arc::new(FlakyAdapter {
        fail_on: "none",
        calls: AtomicUsize::new(0),
    });

    struct Shared(Arc<FlakyAdapter>);

    #[async_trait]
    impl SourceAdapter for Shared {
        fn name(&self) -> &'static str {
            self.0.name()
        }
        fn kind(&self) -> RecordKind {
            self.0.kind()
        }
        fn targets(&self, set: &TargetSet) -> Vec<Target> {
            self.0.targets(set)
        }
        async fn fetch_candidates(&self, target: &Target) -> Result<Vec<RawItem>, SourceError> {
            self.0.fetch_candidates(target).await
        }
    }

    let pipeline = IngestionPipeline::new(store.clone(), vec![Box::new(Shared(adapter.clone()))]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = pipeline.run_cycle(&cancel).await;
    assert!(report.cancelled);
    assert!(report.outcomes.is_empty());
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    assert!(store.records(RecordKind::News).await.unwrap().is_empty());
}

#[tokio::test]
async fn cycle_with_no_reference_data_completes_empty() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = IngestionPipeline::new(
        store,
        vec![Box::new(NewsFeedAdapter::new(
            Arc::new(FixtureFeedFetcher::new()),
            10,
        ))],
    );
    let report = pipeline.run_cycle(&CancellationToken::new()).await;
    assert!(report.outcomes.is_empty());
    assert_eq!(report.persisted, 0);
    assert!(report.finished_at >= report.started_at);
}
