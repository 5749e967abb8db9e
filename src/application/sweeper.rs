//! Periodic eviction of expired records.
//!
//! Record lists only shrink when something looks at them, so idle keys would
//! otherwise hold their expired records forever. The sweeper walks the cache
//! every Nth limiter call, prunes records older than the longest configured
//! window for their scope, and drops keys whose lists become empty from both
//! the cache and the durable store.
//!
//! Eviction is an optimization, never a correctness mechanism: in-window
//! counting already ignores expired records wherever they linger.

use crate::application::guard::StoreGuard;
use crate::application::limiter::persist_entry;
use crate::application::metrics::Metrics;
use crate::application::ports::RecordStore;
use crate::domain::tier::{TierConfig, TierScope};
use crate::infrastructure::cache::CounterCache;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of one sweep pass over the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Keys examined
    pub keys_visited: u64,
    /// Expired records removed across all keys
    pub records_pruned: u64,
    /// Keys removed entirely because no records remained
    pub keys_removed: u64,
}

/// Eviction scheduler and executor.
///
/// A record is retained as long as any tier of its scope could still count
/// it, so the horizon per scope is that scope's longest configured window.
#[derive(Debug)]
pub(crate) struct Sweeper {
    /// Sweep every Nth call; zero disables periodic sweeping
    every: u64,
    calls: AtomicU64,
    /// Longest window per configured scope, epoch-millisecond units
    horizons: Vec<(TierScope, u64)>,
}

impl Sweeper {
    pub(crate) fn new(tiers: &[TierConfig], every: u64) -> Self {
        let mut horizons: Vec<(TierScope, u64)> = Vec::new();
        for tier in tiers {
            match horizons.iter_mut().find(|(scope, _)| *scope == tier.scope) {
                Some((_, horizon)) => *horizon = (*horizon).max(tier.window_ms()),
                None => horizons.push((tier.scope, tier.window_ms())),
            }
        }
        Self {
            every,
            calls: AtomicU64::new(0),
            horizons,
        }
    }

    /// Count one limiter call and report whether a sweep is due.
    pub(crate) fn should_sweep(&self) -> bool {
        if self.every == 0 {
            return false;
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        calls % self.every == 0
    }

    pub(crate) fn horizon_for(&self, scope: TierScope) -> Option<u64> {
        self.horizons
            .iter()
            .find(|(s, _)| *s == scope)
            .map(|(_, horizon)| *horizon)
    }

    /// Walk the cache once, pruning and evicting.
    ///
    /// Runs under each entry's lock in turn, so it serializes with admission
    /// per key but never blocks the whole cache.
    pub(crate) fn sweep<S: RecordStore>(
        &self,
        cache: &CounterCache,
        store: &S,
        guard: &StoreGuard,
        metrics: &Metrics,
        now: u64,
    ) -> SweepStats {
        let mut stats = SweepStats::default();

        cache.retain(|key, entry| {
            stats.keys_visited += 1;

            // A scope with no configured tier has no retention horizon;
            // leave its entries alone
            let Some(horizon) = self.horizon_for(key.scope()) else {
                return true;
            };

            let pruned = entry.log.prune_expired(now.saturating_sub(horizon));
            if pruned > 0 {
                stats.records_pruned += pruned;
                entry.dirty = true;
                metrics.record_evicted(pruned);
            }
            if entry.dirty {
                persist_entry(store, guard, metrics, key, entry);
            }

            // An empty, fully-persisted list means the store key is gone
            // too; drop the cache entry. A failed persist stays dirty and
            // is retried on a later sweep.
            if entry.log.is_empty() && !entry.dirty {
                stats.keys_removed += 1;
                metrics.record_key_evicted();
                false
            } else {
                true
            }
        });

        tracing::debug!(
            keys_visited = stats.keys_visited,
            records_pruned = stats.records_pruned,
            keys_removed = stats.keys_removed,
            "eviction sweep completed"
        );
        stats
    }
}
