// src/ingest/providers/social.rs
//! Social search adapter: one keyword query per selected instrument.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::types::{RawItem, SourceAdapter, Target, TargetSet};
use crate::model::RecordKind;

const PROVIDER: &str = "twitter";

/// A post returned by a social search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialPost {
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SocialSearchClient: Send + Sync {
    /// Recent posts matching `query`, at most `max_results`.
    async fn search_recent(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SocialPost>, SourceError>;
}

/// Twitter/X v2 recent search with an app bearer token.
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, bearer_token: String) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl SocialSearchClient for TwitterClient {
    async fn search_recent(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SocialPost>, SourceError> {
        // The endpoint only accepts 10..=100.
        let api_max = max_results.clamp(10, 100).to_string();
        let resp = self
            .http
            .get(format!("{}/tweets/search/recent", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query),
                ("max_results", api_max.as_str()),
                ("tweet.fields", "created_at,text"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))?;

        if !resp.status().is_success() {
            return Err(SourceError::from_status(PROVIDER, resp.status()));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::malformed(PROVIDER, e))?;

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .map(|t| SocialPost {
                text: t.text,
                created_at: t.created_at,
            })
            .collect())
    }
}

pub struct SocialSearchAdapter {
    client: Arc<dyn SocialSearchClient>,
    query_template: String,
    symbol_cap: usize,
    max_results: usize,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl SocialSearchAdapter {
    pub fn new(client: Arc<dyn SocialSearchClient>) -> Self {
        Self {
            client,
            query_template: "{symbol} crypto".into(),
            symbol_cap: 5,
            max_results: 20,
            min_interval: Duration::ZERO,
            last_call: Mutex::new(None),
        }
    }

    pub fn with_query_template(mut self, template: impl Into<String>) -> Self {
        self.query_template = template.into();
        self
    }

    pub fn with_symbol_cap(mut self, cap: usize) -> Self {
        self.symbol_cap = cap;
        self
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    pub fn with_min_interval(mut self, d: Duration) -> Self {
        self.min_interval = d;
        self
    }

    pub fn query_for(&self, symbol: &str) -> String {
        self.query_template.replace("{symbol}", symbol)
    }

    /// Wait until `min_interval` has passed since the previous call.
    async fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl SourceAdapter for SocialSearchAdapter {
    fn name(&self) -> &'static str {
        "social"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Social
    }

    fn targets(&self, set: &TargetSet) -> Vec<Target> {
        set.symbols
            .iter()
            .take(self.symbol_cap)
            .cloned()
            .map(Target::Instrument)
            .collect()
    }

    async fn fetch_candidates(&self, target: &Target) -> Result<Vec<RawItem>, SourceError> {
        let Target::Instrument(symbol) = target else {
            return Ok(Vec::new());
        };

        self.pace().await;
        let posts = self
            .client
            .search_recent(&self.query_for(symbol), self.max_results)
            .await?;

        Ok(posts
            .into_iter()
            .take(self.max_results)
            .map(|p| RawItem {
                subject_key: symbol.clone(),
                text: normalize_text(&p.text),
                observed_at: p.created_at,
                link: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopClient;

    #[async_trait]
    impl SocialSearchClient for NoopClient {
        async fn search_recent(&self, _: &str, _: usize) -> Result<Vec<SocialPost>, SourceError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn query_template_and_cap() {
        let a = SocialSearchAdapter::new(Arc::new(NoopClient)).with_symbol_cap(2);
        assert_eq!(a.query_for("XBTUSD"), "XBTUSD crypto");

        let set = TargetSet {
            symbols: vec!["A".into(), "B".into(), "C".into()],
            sources: vec![],
        };
        let t = a.targets(&set);
        assert_eq!(
            t,
            vec![Target::Instrument("A".into()), Target::Instrument("B".into())]
        );
    }

    #[test]
    fn tweet_payload_without_data_is_empty() {
        let r: SearchResponse = serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(r.data.is_none());
    }
}
