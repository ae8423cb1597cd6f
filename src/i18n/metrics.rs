//! Translation metrics and observability.
//!
//! Counters are owned by one translator instance, so independent
//! translators (e.g., one per test) never share numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-translator lookup and load counters.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Keys resolved from a loaded table
    lookup_hits: AtomicUsize,

    /// Keys that fell back to the key itself
    lookup_misses: AtomicUsize,

    /// Language loads handed to the loader
    loads_started: AtomicUsize,

    /// Language loads the loader rejected
    load_failures: AtomicUsize,

    /// Interpolations that failed to evaluate
    eval_failures: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup_hit(&self) {
        self.lookup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_miss(&self) {
        self.lookup_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_started(&self) {
        self.loads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eval_failure(&self) {
        self.eval_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookup_hits(&self) -> usize {
        self.lookup_hits.load(Ordering::Relaxed)
    }

    pub fn lookup_misses(&self) -> usize {
        self.lookup_misses.load(Ordering::Relaxed)
    }

    pub fn loads_started(&self) -> usize {
        self.loads_started.load(Ordering::Relaxed)
    }

    pub fn load_failures(&self) -> usize {
        self.load_failures.load(Ordering::Relaxed)
    }

    pub fn eval_failures(&self) -> usize {
        self.eval_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.lookup_hits();
        let misses = self.lookup_misses();
        let total_lookups = hits + misses;
        let hit_rate = if total_lookups > 0 {
            (hits as f64 / total_lookups as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            lookup_hits: hits,
            lookup_misses: misses,
            hit_rate,
            loads_started: self.loads_started(),
            load_failures: self.load_failures(),
            eval_failures: self.eval_failures(),
        }
    }
}

/// Snapshot of a translator's counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub lookup_hits: usize,
    pub lookup_misses: usize,

    /// Hit rate as a percentage (0-100)
    pub hit_rate: f64,

    pub loads_started: usize,
    pub load_failures: usize,
    pub eval_failures: usize,
}
