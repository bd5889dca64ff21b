// src/config.rs
//! Pipeline configuration.
//!
//! Lookup order:
//! 1) `$PIPELINE_CONFIG_PATH` (must exist)
//! 2) `config/pipeline.toml`
//! 3) built-in defaults
//!
//! `PIPELINE_DATA_DIR` and `TWITTER_BEARER_TOKEN` are applied on top.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{SentimentSource, SourceKind};

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "PIPELINE_DATA_DIR";
pub const ENV_TWITTER_BEARER: &str = "TWITTER_BEARER_TOKEN";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub aggregate: AggregateConfig,
    pub http: HttpConfig,
    pub social: SocialConfig,
    pub market: MarketConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    /// Seed list written to the source collection when it is empty.
    /// Falls back to [`default_sources`] when absent.
    pub sources: Option<Vec<SentimentSource>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub interval_secs: u64,
    /// Symbols must end in one of these to be queried.
    pub quote_suffixes: Vec<String>,
    /// Only the first N selected symbols are searched per cycle.
    pub social_symbol_cap: usize,
    pub social_max_results: usize,
    /// `{symbol}` is replaced with the instrument symbol.
    pub social_query_template: String,
    /// Minimum spacing between two social search calls.
    pub social_min_interval_ms: u64,
    pub feed_entry_cap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            quote_suffixes: vec!["USDT".into(), "USD".into()],
            social_symbol_cap: 5,
            social_max_results: 20,
            social_query_template: "{symbol} crypto".into(),
            social_min_interval_ms: 0,
            feed_entry_cap: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub interval_secs: u64,
    /// Restrict means to records observed within this many seconds.
    /// `None` keeps the full-history mean.
    pub window_secs: Option<u64>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            window_secs: None,
        }
    }
}

impl AggregateConfig {
    pub fn window(&self) -> Option<Duration> {
        self.window_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 4,
            timeout_secs: 10,
            user_agent: "crypto-sentiment-pipeline/0.1".into(),
        }
    }
}

impl HttpConfig {
    /// Shared client with explicit per-call timeouts.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("building http client")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub base_url: String,
    /// Never read from the file; comes from `TWITTER_BEARER_TOKEN`.
    #[serde(skip)]
    pub bearer_token: Option<String>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com/2".into(),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub base_url: String,
    pub instrument_seed_count: u32,
    pub trade_history_count: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bitmex.com/api/v1".into(),
            instrument_seed_count: 50,
            trade_history_count: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub summary_limit: usize,
    pub summary_limit_max: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            summary_limit: 20,
            summary_limit_max: 500,
        }
    }
}

impl PipelineConfig {
    /// Parse TOML text. Missing sections take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pipeline config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Env path → `config/pipeline.toml` → defaults, then env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.storage.data_dir = PathBuf::from(dir.trim());
            }
        }
        self.social.bearer_token = std::env::var(ENV_TWITTER_BEARER)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    /// Sources to seed: the configured list, or the built-in feed list.
    pub fn seed_sources(&self) -> Vec<SentimentSource> {
        self.sources.clone().unwrap_or_else(default_sources)
    }
}

/// Built-in crypto news feeds.
pub fn default_sources() -> Vec<SentimentSource> {
    [
        ("coindesk", "CoinDesk", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
        ("cointelegraph", "CoinTelegraph", "https://cointelegraph.com/rss"),
        ("theblock", "The Block", "https://api.theblockcrypto.com/rss"),
        ("decrypt", "Decrypt", "https://decrypt.co/feed"),
        ("dailyhodl", "Daily Hodl", "https://dailyhodl.com/feed/"),
        ("binance", "Binance", "https://www.binance.com/en/rss"),
        (
            "financemagnates",
            "Finance Magnates",
            "https://www.financemagnates.com/tag/cryptocurrencies/feed/",
        ),
    ]
    .into_iter()
    .map(|(id, name, url)| SentimentSource {
        source_id: id.to_string(),
        display_name: name.to_string(),
        endpoint: url.to_string(),
        kind: SourceKind::NewsFeed,
    })
    .collect()
}
