// tests/providers_rss.rs
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use crypto_sentiment_pipeline::error::SourceError;
use crypto_sentiment_pipeline::ingest::providers::rss::{
    parse_feed, FixtureFeedFetcher, NewsFeedAdapter,
};
use crypto_sentiment_pipeline::ingest::types::{SourceAdapter, Target, TargetSet};
use crypto_sentiment_pipeline::model::{RecordKind, SentimentSource, SourceKind};

const RSS_XML: &str = include_str!("fixtures/crypto_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/crypto_atom.xml");
const LONG_XML: &str = include_str!("fixtures/long_rss.xml");
const BROKEN_XML: &str = include_str!("fixtures/broken_feed.xml");
const ENTITIES_XML: &str = include_str!("fixtures/entities_rss.xml");

fn source(name: &str, url: &str) -> SentimentSource {
    SentimentSource {
        source_id: name.to_lowercase(),
        display_name: name.to_string(),
        endpoint: url.to_string(),
        kind: SourceKind::NewsFeed,
    }
}

fn adapter(fetcher: FixtureFeedFetcher, cap: usize) -> NewsFeedAdapter {
    NewsFeedAdapter::new(Arc::new(fetcher), cap)
}

#[test]
fn rss_fixture_parses_all_items() {
    let entries = parse_feed(RSS_XML).expect("rss parse ok");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].title, "Bitcoin rally extends as ETF inflows surge");
    assert_eq!(
        entries[0].published,
        Some(Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 0).unwrap())
    );
    assert!(entries[1].published.is_none(), "second item has no pubDate");
    assert!(entries[2].description.is_none());
}

#[test]
fn atom_fixture_parses_links_and_dates() {
    let entries = parse_feed(ATOM_XML).expect("atom parse ok");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "Solana outage sparks panic selloff");
    assert_eq!(
        entries[0].link.as_deref(),
        Some("https://chain.example.test/sol-outage")
    );
    assert_eq!(
        entries[0].published,
        Some(Utc.with_ymd_and_hms(2025, 6, 10, 11, 0, 0).unwrap())
    );
    // Falls back to <updated> when <published> is absent.
    assert_eq!(
        entries[1].published,
        Some(Utc.with_ymd_and_hms(2025, 6, 9, 9, 15, 0).unwrap())
    );
}

#[test]
fn non_feed_document_is_malformed() {
    let err = parse_feed(BROKEN_XML).unwrap_err();
    assert!(matches!(err, SourceError::Malformed { .. }), "got {err:?}");
}

#[tokio::test]
async fn html_named_entities_do_not_drop_the_feed() {
    let a = adapter(
        FixtureFeedFetcher::new().with_feed("https://desk.test/rss", ENTITIES_XML),
        10,
    );
    let target = Target::Source(source("Chain Desk", "https://desk.test/rss"));

    let items = a.fetch_candidates(&target).await.expect("entities parse");
    assert_eq!(items.len(), 2);
    assert!(
        items[0]
            .text
            .starts_with("Société Générale lists euro stablecoin"),
        "got {:?}",
        items[0].text
    );
    assert!(items[0].text.contains("first step"));
    assert!(items[0].text.contains("& more to come"));
    assert!(items[1].text.starts_with("Solana outage resolved Validators restarted"));
}

#[tokio::test]
async fn missing_pub_date_falls_back_to_ingestion_time() {
    let a = adapter(
        FixtureFeedFetcher::new().with_feed("https://wire.test/rss", RSS_XML),
        10,
    );
    let target = Target::Source(source("Crypto Wire", "https://wire.test/rss"));

    let items = a.fetch_candidates(&target).await.expect("fetch ok");
    assert_eq!(items.len(), 3);

    let ingested_at = Utc::now();
    let records: Vec<_> = items
        .into_iter()
        .map(|it| a.to_record(it, ingested_at))
        .collect();

    assert!(records.iter().all(|r| r.kind == RecordKind::News));
    assert!(records.iter().all(|r| r.subject_key == "Crypto Wire"));
    assert_eq!(records[1].observed_at, ingested_at);
    assert_ne!(records[0].observed_at, ingested_at);
}

#[tokio::test]
async fn news_text_joins_title_and_clean_description() {
    let a = adapter(
        FixtureFeedFetcher::new().with_feed("https://wire.test/rss", RSS_XML),
        10,
    );
    let target = Target::Source(source("Crypto Wire", "https://wire.test/rss"));
    let items = a.fetch_candidates(&target).await.unwrap();

    assert_eq!(
        items[0].text,
        "Bitcoin rally extends as ETF inflows surge Strong demand pushed BTC to a record high."
    );
    assert_eq!(
        items[0].link.as_deref(),
        Some("https://wire.example.test/btc-rally")
    );

    let rec = a.to_record(items[0].clone(), Utc::now());
    assert!(rec.score > 0.0);
    let rec = a.to_record(items[1].clone(), Utc::now());
    assert!(rec.score < 0.0);
}

#[tokio::test]
async fn entry_cap_keeps_first_entries_in_feed_order() {
    let a = adapter(
        FixtureFeedFetcher::new().with_feed("https://long.test/rss", LONG_XML),
        10,
    );
    let target = Target::Source(source("Long", "https://long.test/rss"));
    let items = a.fetch_candidates(&target).await.unwrap();
    assert_eq!(items.len(), 10);
    assert!(items[0].text.starts_with("Headline 0 "));
    assert!(items[9].text.starts_with("Headline 9 "));
}

#[tokio::test]
async fn unreachable_feed_is_transient() {
    let a = adapter(FixtureFeedFetcher::new(), 10);
    let target = Target::Source(source("Gone", "https://gone.test/rss"));
    let err = a.fetch_candidates(&target).await.unwrap_err();
    assert!(matches!(err, SourceError::Transient { .. }));
}

#[test]
fn only_news_feed_sources_become_targets() {
    let a = adapter(FixtureFeedFetcher::new(), 10);
    let mut social = source("Search", "{symbol} crypto");
    social.kind = SourceKind::SocialSearch;
    let set = TargetSet {
        symbols: vec!["XBTUSD".into()],
        sources: vec![source("A", "https://a.test"), social],
    };
    let targets = a.targets(&set);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].label(), "A");
}
