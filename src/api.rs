//! Read-only HTTP surface: latest summaries, price passthrough, diagnostics.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::config::ApiConfig;
use crate::error::StoreError;
use crate::ingest::providers::market::MarketDataClient;
use crate::ingest::IngestionReport;
use crate::model::{SentimentSummary, Trade};
use crate::reports::ReportLog;
use crate::store::SentimentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SentimentStore>,
    pub market: Arc<dyn MarketDataClient>,
    pub reports: Arc<ReportLog>,
    pub api: ApiConfig,
    pub trade_history_count: u32,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SentimentStore>,
        market: Arc<dyn MarketDataClient>,
        reports: Arc<ReportLog>,
    ) -> Self {
        Self {
            store,
            market,
            reports,
            api: ApiConfig::default(),
            trade_history_count: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} required")]
    MissingParameter(&'static str),

    #[error("storage: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(target: "api", error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/sentiment", get(latest_sentiment))
        .route("/api/prices", get(prices))
        .route("/debug/last-ingest", get(last_ingest))
        .route("/debug/ingest-history", get(ingest_history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SentimentQuery {
    limit: Option<usize>,
}

async fn latest_sentiment(
    State(state): State<AppState>,
    Query(q): Query<SentimentQuery>,
) -> Result<Json<Vec<SentimentSummary>>, ApiError> {
    let limit = q
        .limit
        .unwrap_or(state.api.summary_limit)
        .min(state.api.summary_limit_max);
    let rows = state.store.latest_summaries(limit).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    symbol: Option<String>,
}

async fn prices(
    State(state): State<AppState>,
    Query(q): Query<PriceQuery>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    let symbol = q
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingParameter("symbol"))?;
    // Provider failures degrade to "no prices available".
    match state
        .market
        .trade_history(symbol, state.trade_history_count)
        .await
    {
        Ok(trades) => Ok(Json(trades)),
        Err(e) => {
            tracing::warn!(target: "api", symbol, error = %e, "trade history unavailable");
            Ok(Json(Vec::new()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    n: Option<usize>,
}

async fn ingest_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<IngestionReport>> {
    Json(state.reports.snapshot_last_n(q.n.unwrap_or(10)))
}

async fn last_ingest(State(state): State<AppState>) -> Json<Option<IngestionReport>> {
    Json(state.reports.last())
}
