// Metrics hooks for the `matcher` crate.
//
// Install a global `MatchMetrics` implementation via [`set_match_metrics`] and
// every `Matcher::search` reports its latency, candidate count, hit count and
// which scoring path ran.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::ScoreSource;

/// Metrics observer for searches.
pub trait MatchMetrics: Send + Sync {
    /// Record a finished search.
    ///
    /// `source` is `None` when no scoring ran (blank query, zero limit, or no
    /// candidates). `hit_count` is the number of results returned after
    /// thresholding and truncation.
    fn record_search(
        &self,
        source: Option<ScoreSource>,
        latency: Duration,
        candidate_count: usize,
        hit_count: usize,
    );

    /// Record that the embedding path failed and keyword ranking took over.
    fn record_fallback(&self) {}
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global search metrics recorder.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
