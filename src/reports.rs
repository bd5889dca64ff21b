//! reports.rs — bounded in-memory log of recent ingestion reports.

use std::sync::Mutex;

use crate::ingest::IngestionReport;

#[derive(Debug)]
pub struct ReportLog {
    inner: Mutex<Vec<IngestionReport>>,
    cap: usize,
}

impl ReportLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 1_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, report: IngestionReport) {
        let Ok(mut v) = self.inner.lock() else {
            tracing::warn!(target: "ingest", "report log poisoned; dropping report");
            return;
        };
        v.push(report);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn last(&self) -> Option<IngestionReport> {
        self.inner.lock().ok().and_then(|v| v.last().cloned())
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<IngestionReport> {
        let Ok(v) = self.inner.lock() else {
            return Vec::new();
        };
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}
