// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod reports;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::api::router;
pub use crate::ingest::{IngestionPipeline, IngestionReport};
pub use crate::store::SentimentStore;
