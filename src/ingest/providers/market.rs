// src/ingest/providers/market.rs
//! Exchange reference data: instrument listing and trade history.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::{Instrument, Trade};

const PROVIDER: &str = "bitmex";

#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn list_instruments(&self, count: u32) -> Result<Vec<Instrument>, SourceError>;

    /// Most recent trades first, at most `count`.
    async fn trade_history(&self, symbol: &str, count: u32) -> Result<Vec<Trade>, SourceError>;
}

pub struct BitmexClient {
    http: reqwest::Client,
    base_url: String,
}

impl BitmexClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(PROVIDER, e))?;
        if !resp.status().is_success() {
            return Err(SourceError::from_status(PROVIDER, resp.status()));
        }
        resp.json::<T>()
            .await
            .map_err(|e| SourceError::malformed(PROVIDER, e))
    }
}

#[async_trait]
impl MarketDataClient for BitmexClient {
    async fn list_instruments(&self, count: u32) -> Result<Vec<Instrument>, SourceError> {
        self.get_json("/instrument", &[("count", count.to_string())])
            .await
    }

    async fn trade_history(&self, symbol: &str, count: u32) -> Result<Vec<Trade>, SourceError> {
        self.get_json(
            "/trade",
            &[
                ("symbol", symbol.to_string()),
                ("count", count.to_string()),
                ("reverse", "true".to_string()),
            ],
        )
        .await
    }
}
