// src/ingest/scheduler.rs
//! Drives ingestion and aggregation on independent cadences from one task,
//! so a cycle always finishes before the next one starts.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregator;
use crate::ingest::IngestionPipeline;
use crate::reports::ReportLog;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub ingest_interval: Duration,
    pub aggregate_interval: Duration,
}

/// Cancel `cancel` once `signal` resolves. Used to stop the scheduler (and any
/// in-flight cycle, between targets) on process shutdown.
pub fn cancel_on<F>(signal: F, cancel: CancellationToken) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = signal => {
                tracing::info!(target: "ingest", "shutdown signal, cancelling pipeline");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

pub fn spawn_pipeline(
    cfg: SchedulerCfg,
    pipeline: Arc<IngestionPipeline>,
    aggregator: Arc<Aggregator>,
    reports: Arc<ReportLog>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ingest_tick = tokio::time::interval(cfg.ingest_interval);
        let mut aggregate_tick = tokio::time::interval(cfg.aggregate_interval);
        ingest_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        aggregate_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(target: "ingest", "scheduler stopped");
                    break;
                }
                _ = ingest_tick.tick() => {
                    let report = pipeline.run_cycle(&cancel).await;
                    counter!("ingest_runs_total").increment(1);
                    reports.push(report);
                }
                _ = aggregate_tick.tick() => {
                    match aggregator.run().await {
                        Ok(rows) => tracing::info!(
                            target: "aggregate",
                            summaries = rows.len(),
                            "aggregation tick"
                        ),
                        Err(e) => tracing::warn!(
                            target: "aggregate",
                            error = %e,
                            "aggregation failed"
                        ),
                    }
                }
            }
        }
    })
}
