//! Seed-if-empty reference data: news sources and exchange instruments.

use anyhow::{Context, Result};

use crate::ingest::providers::market::MarketDataClient;
use crate::model::{InstrumentState, SentimentSource};
use crate::store::SentimentStore;

/// Insert `defaults` when the source collection is empty. Returns how many were written.
pub async fn seed_sources_if_empty(
    store: &dyn SentimentStore,
    defaults: &[SentimentSource],
) -> Result<usize> {
    let existing = store.sources().await.context("reading sources")?;
    if !existing.is_empty() {
        return Ok(0);
    }
    store
        .insert_sources(defaults)
        .await
        .context("seeding sources")?;
    tracing::info!(target: "bootstrap", count = defaults.len(), "sources seeded");
    Ok(defaults.len())
}

/// Pull the instrument list once and keep the `Open` ones, if none are stored yet.
pub async fn seed_instruments_if_empty(
    store: &dyn SentimentStore,
    market: &dyn MarketDataClient,
    count: u32,
) -> Result<usize> {
    let existing = store.instruments().await.context("reading instruments")?;
    if !existing.is_empty() {
        return Ok(0);
    }

    let listed = market
        .list_instruments(count)
        .await
        .context("fetching instrument list")?;
    let open: Vec<_> = listed
        .into_iter()
        .filter(|i| i.state == InstrumentState::Open)
        .collect();

    store
        .insert_instruments(&open)
        .await
        .context("seeding instruments")?;
    tracing::info!(target: "bootstrap", count = open.len(), "instruments seeded");
    Ok(open.len())
}
