// src/ingest/providers/rss.rs
//! News feed adapter: RSS 2.0 and Atom.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use once_cell::sync::OnceCell;
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::types::{RawItem, SourceAdapter, Target, TargetSet};
use crate::model::{RecordKind, SourceKind};

const PROVIDER: &str = "rss";

/// Fetches a feed body by URL.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    /// `client` should carry the configured timeouts.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))?;
        if !resp.status().is_success() {
            return Err(SourceError::from_status(PROVIDER, resp.status()));
        }
        resp.text()
            .await
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))
    }
}

/// Serves feed bodies from memory, keyed by URL. Unknown URLs are transient failures.
#[derive(Debug, Default, Clone)]
pub struct FixtureFeedFetcher {
    feeds: HashMap<String, String>,
}

impl FixtureFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.feeds.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl FeedFetcher for FixtureFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::transient(PROVIDER, format!("unreachable feed {url}")))
    }
}

/// One parsed feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse a feed timestamp: RFC 2822 (RSS) or RFC 3339 (Atom).
pub fn parse_feed_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let odt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

/// Local name of the document's root element.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse an RSS or Atom document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, SourceError> {
    let xml_clean = scrub_html_entities_for_xml(xml);

    match root_element(&xml_clean).as_deref() {
        Some("rss") => parse_rss(&xml_clean),
        Some("feed") => parse_atom(&xml_clean),
        Some(other) => Err(SourceError::malformed(
            PROVIDER,
            format!("unsupported root element <{other}>"),
        )),
        None => Err(SourceError::malformed(PROVIDER, "no root element")),
    }
}

fn parse_rss(xml: &str) -> Result<Vec<FeedEntry>, SourceError> {
    let rss: Rss =
        from_str(xml).map_err(|e| SourceError::malformed(PROVIDER, format!("rss: {e}")))?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedEntry {
            title: it.title.unwrap_or_default(),
            description: it.description,
            link: it.link,
            published: it.pub_date.as_deref().and_then(parse_feed_timestamp),
        })
        .collect())
}

fn parse_atom(xml: &str) -> Result<Vec<FeedEntry>, SourceError> {
    let atom: AtomFeed =
        from_str(xml).map_err(|e| SourceError::malformed(PROVIDER, format!("atom: {e}")))?;
    Ok(atom
        .entry
        .into_iter()
        .map(|e| {
            let link = e
                .link
                .iter()
                .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
                .or_else(|| e.link.first())
                .and_then(|l| l.href.clone());
            let published = e
                .published
                .as_deref()
                .or(e.updated.as_deref())
                .and_then(parse_feed_timestamp);
            FeedEntry {
                title: e.title.map(|t| t.text).unwrap_or_default(),
                description: e.summary.or(e.content).map(|t| t.text),
                link,
                published,
            }
        })
        .collect())
}

/// Rewrite named HTML entities (`&eacute;`, `&nbsp;`, ...) as numeric character
/// references so the XML parser accepts them. The five XML entities are kept;
/// names HTML does not know are dropped.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]{1,31});").expect("static entity regex"));

    re.replace_all(s, |caps: &regex::Captures<'_>| {
        let whole = &caps[0];
        match &caps[1] {
            "amp" | "lt" | "gt" | "quot" | "apos" => whole.to_string(),
            _ => {
                let decoded = html_escape::decode_html_entities(whole);
                if decoded == whole {
                    String::new()
                } else {
                    decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
                }
            }
        }
    })
    .into_owned()
}

/// One adapter for every `NewsFeed` source; each source is a separate target.
pub struct NewsFeedAdapter {
    fetcher: Arc<dyn FeedFetcher>,
    entry_cap: usize,
}

impl NewsFeedAdapter {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, entry_cap: usize) -> Self {
        Self { fetcher, entry_cap }
    }
}

#[async_trait]
impl SourceAdapter for NewsFeedAdapter {
    fn name(&self) -> &'static str {
        "news"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::News
    }

    fn targets(&self, set: &TargetSet) -> Vec<Target> {
        set.sources
            .iter()
            .filter(|s| s.kind == SourceKind::NewsFeed)
            .cloned()
            .map(Target::Source)
            .collect()
    }

    async fn fetch_candidates(&self, target: &Target) -> Result<Vec<RawItem>, SourceError> {
        let Target::Source(source) = target else {
            return Ok(Vec::new());
        };

        let body = self.fetcher.fetch(&source.endpoint).await?;

        let t0 = std::time::Instant::now();
        let entries = parse_feed(&body)?;
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        Ok(entries
            .into_iter()
            .take(self.entry_cap)
            .map(|e| {
                let text_raw = format!(
                    "{} {}",
                    e.title,
                    e.description.as_deref().unwrap_or_default()
                );
                RawItem {
                    subject_key: source.display_name.clone(),
                    text: normalize_text(&text_raw),
                    observed_at: e.published,
                    link: e.link,
                }
            })
            .collect())
    }
}
