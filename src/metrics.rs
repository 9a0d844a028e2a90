use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis activity.
#[derive(Default)]
pub struct AnalysisMetrics {
    analyses_succeeded: AtomicU64,
    analyses_failed: AtomicU64,
    degraded_runs: AtomicU64,
    items_analyzed: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run over `item_count` items.
    pub fn record_success(&self, item_count: u64, degraded: bool) {
        self.analyses_succeeded.fetch_add(1, Ordering::Relaxed);
        self.items_analyzed.fetch_add(item_count, Ordering::Relaxed);
        if degraded {
            self.degraded_runs.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a run that ended in the failure envelope.
    pub fn record_failure(&self) {
        self.analyses_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            analyses_succeeded: self.analyses_succeeded.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            degraded_runs: self.degraded_runs.load(Ordering::Relaxed),
            items_analyzed: self.items_analyzed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of analysis counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Runs that produced a persisted result.
    pub analyses_succeeded: u64,
    /// Runs that returned the failure envelope.
    pub analyses_failed: u64,
    /// Successful runs whose clustering fell back to singletons.
    pub degraded_runs: u64,
    /// Content items processed across successful runs.
    pub items_analyzed: u64,
}
