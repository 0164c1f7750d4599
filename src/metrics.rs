//! Process-wide metrics observer.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Metrics observer for engine stages.
pub trait AkinMetrics: Send + Sync {
    /// One signature pass over a column.
    fn record_signatures(&self, latency: Duration, rows: usize, unindexable: usize);
    /// One clustering pass.
    fn record_grouping(&self, latency: Duration, clusters: usize);
    /// One query over one or more groups.
    fn record_query(&self, latency: Duration, hits: usize);
}

/// Install or clear the global metrics recorder.
pub fn set_akin_metrics(recorder: Option<Arc<dyn AkinMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn AkinMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn AkinMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn AkinMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Timer that reports to the recorder installed when it started, if any.
pub(crate) struct MetricsSpan {
    recorder: Arc<dyn AkinMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_signatures(self, rows: usize, unindexable: usize) {
        self.recorder
            .record_signatures(self.start.elapsed(), rows, unindexable);
    }

    pub(crate) fn record_grouping(self, clusters: usize) {
        self.recorder.record_grouping(self.start.elapsed(), clusters);
    }

    pub(crate) fn record_query(self, hits: usize) {
        self.recorder.record_query(self.start.elapsed(), hits);
    }
}
