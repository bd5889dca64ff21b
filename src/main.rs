//! Sentiment pipeline — binary entrypoint.
//! Loads configuration, opens the store, seeds reference data, starts the
//! ingestion/aggregation scheduler and serves the query API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_sentiment_pipeline::{
    api::{self, AppState},
    bootstrap,
    config::PipelineConfig,
    ingest::{
        providers::{
            market::{BitmexClient, MarketDataClient},
            rss::{HttpFeedFetcher, NewsFeedAdapter},
            social::{SocialSearchAdapter, TwitterClient},
        },
        scheduler::{cancel_on, spawn_pipeline, SchedulerCfg},
        types::SourceAdapter,
        IngestionPipeline,
    },
    metrics::Metrics,
    reports::ReportLog,
    store::{JsonlStore, SentimentStore},
    Aggregator,
};

/// Compact logs by default, JSON with `LOG_FORMAT=json`.
/// Uses `try_init` because the Shuttle runtime may already have installed a subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_sentiment_pipeline=info,ingest=info,aggregate=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Install the recorder before the scheduler emits its first series.
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let cfg = PipelineConfig::load_default()?;
    let http = cfg.http.build_client()?;

    let store: Arc<dyn SentimentStore> = Arc::new(
        JsonlStore::open(&cfg.storage.data_dir)
            .await
            .with_context(|| format!("opening store at {}", cfg.storage.data_dir.display()))?,
    );
    let market: Arc<dyn MarketDataClient> =
        Arc::new(BitmexClient::new(http.clone(), cfg.market.base_url.clone()));

    bootstrap::seed_sources_if_empty(store.as_ref(), &cfg.seed_sources()).await?;
    if let Err(e) = bootstrap::seed_instruments_if_empty(
        store.as_ref(),
        market.as_ref(),
        cfg.market.instrument_seed_count,
    )
    .await
    {
        // Retried on next start; news ingestion does not need instruments.
        tracing::warn!(target: "bootstrap", error = ?e, "instrument seed failed");
    }

    let mut adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(NewsFeedAdapter::new(
        Arc::new(HttpFeedFetcher::new(http.clone())),
        cfg.ingest.feed_entry_cap,
    ))];
    match cfg.social.bearer_token.clone() {
        Some(token) => {
            let client = TwitterClient::new(http.clone(), cfg.social.base_url.clone(), token);
            adapters.push(Box::new(
                SocialSearchAdapter::new(Arc::new(client))
                    .with_query_template(cfg.ingest.social_query_template.clone())
                    .with_symbol_cap(cfg.ingest.social_symbol_cap)
                    .with_max_results(cfg.ingest.social_max_results)
                    .with_min_interval(Duration::from_millis(cfg.ingest.social_min_interval_ms)),
            ));
        }
        None => {
            tracing::warn!(target: "ingest", "TWITTER_BEARER_TOKEN not set; social ingestion disabled");
        }
    }

    let pipeline = Arc::new(
        IngestionPipeline::new(store.clone(), adapters)
            .with_quote_suffixes(cfg.ingest.quote_suffixes.clone()),
    );
    let aggregator = Arc::new(Aggregator::new(store.clone()).with_window(cfg.aggregate.window()));
    let reports = Arc::new(ReportLog::with_capacity(50));

    let cancel = CancellationToken::new();
    spawn_pipeline(
        SchedulerCfg {
            ingest_interval: Duration::from_secs(cfg.ingest.interval_secs.max(1)),
            aggregate_interval: Duration::from_secs(cfg.aggregate.interval_secs.max(1)),
        },
        pipeline,
        aggregator,
        reports.clone(),
        cancel.clone(),
    );
    cancel_on(
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "shutdown signal listener failed");
                std::future::pending::<()>().await;
            }
        },
        cancel,
    );

    let mut state = AppState::new(store, market, reports);
    state.api = cfg.api.clone();
    state.trade_history_count = cfg.market.trade_history_count;

    let mut router = api::router(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
