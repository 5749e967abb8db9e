//! Observability counters for admission behavior.
//!
//! All counters use atomic operations for thread-safe updates and reads and
//! can be queried at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters tracking limiter behavior.
///
/// Cloning is cheap and clones share the same underlying counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Attempts admitted
    attempts_allowed: AtomicU64,
    /// Attempts denied by a tier or by a missing identity
    attempts_denied: AtomicU64,
    /// Expired records removed by the eviction sweeper
    records_evicted: AtomicU64,
    /// Keys removed entirely by the eviction sweeper
    keys_evicted: AtomicU64,
    /// Durable-store operations that failed and were absorbed
    store_failures: AtomicU64,
}

impl Metrics {
    /// Create a new counter set.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                attempts_allowed: AtomicU64::new(0),
                attempts_denied: AtomicU64::new(0),
                records_evicted: AtomicU64::new(0),
                keys_evicted: AtomicU64::new(0),
                store_failures: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_allowed(&self) {
        self.inner.attempts_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_denied(&self) {
        self.inner.attempts_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, records: u64) {
        self.inner
            .records_evicted
            .fetch_add(records, Ordering::Relaxed);
    }

    pub(crate) fn record_key_evicted(&self) {
        self.inner.keys_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.inner.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Total attempts admitted.
    pub fn attempts_allowed(&self) -> u64 {
        self.inner.attempts_allowed.load(Ordering::Relaxed)
    }

    /// Total attempts denied.
    pub fn attempts_denied(&self) -> u64 {
        self.inner.attempts_denied.load(Ordering::Relaxed)
    }

    /// Total expired records removed by the sweeper.
    pub fn records_evicted(&self) -> u64 {
        self.inner.records_evicted.load(Ordering::Relaxed)
    }

    /// Total keys removed by the sweeper.
    pub fn keys_evicted(&self) -> u64 {
        self.inner.keys_evicted.load(Ordering::Relaxed)
    }

    /// Total absorbed durable-store failures.
    pub fn store_failures(&self) -> u64 {
        self.inner.store_failures.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts_allowed: self.attempts_allowed(),
            attempts_denied: self.attempts_denied(),
            records_evicted: self.records_evicted(),
            keys_evicted: self.keys_evicted(),
            store_failures: self.store_failures(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.attempts_allowed.store(0, Ordering::Relaxed);
        self.inner.attempts_denied.store(0, Ordering::Relaxed);
        self.inner.records_evicted.store(0, Ordering::Relaxed);
        self.inner.keys_evicted.store(0, Ordering::Relaxed);
        self.inner.store_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of limiter counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Attempts admitted
    pub attempts_allowed: u64,
    /// Attempts denied
    pub attempts_denied: u64,
    /// Expired records removed by the sweeper
    pub records_evicted: u64,
    /// Keys removed by the sweeper
    pub keys_evicted: u64,
    /// Absorbed durable-store failures
    pub store_failures: u64,
}

impl MetricsSnapshot {
    /// Ratio of denied attempts to total attempts, 0.0 when idle.
    pub fn denial_rate(&self) -> f64 {
        let total = self.total_attempts();
        if total == 0 {
            0.0
        } else {
            self.attempts_denied as f64 / total as f64
        }
    }

    /// Total attempts processed (allowed + denied).
    pub fn total_attempts(&self) -> u64 {
        self.attempts_allowed.saturating_add(self.attempts_denied)
    }
}
