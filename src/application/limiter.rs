//! Multi-tier admission service.
//!
//! The limiter evaluates every configured tier against an attempt, broadest
//! scope first, and admits the attempt only when all applicable tiers have
//! capacity. An admitted attempt appends one record to every touched key;
//! a denied attempt appends nothing anywhere.
//!
//! Admission per key runs inside that key's cache-entry lock, so counting
//! and appending are atomic per key. When an attempt spans several keys,
//! each key is settled under its own lock in evaluation order and an append
//! is rolled back if a later key denies, so concurrent attempts can never
//! leave an attempt half-recorded.
//!
//! Storage faults never surface to callers: an unreachable store degrades
//! the affected calls to cache-only operation behind the [`StoreGuard`],
//! and unreadable persisted data is discarded and overwritten on the next
//! save. Cached records always survive both fault kinds.

use crate::application::guard::{StoreGuard, StoreGuardConfig};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, RecordStore, StoreError};
use crate::application::sweeper::{SweepStats, Sweeper};
use crate::domain::action::{ActionType, Identity};
use crate::domain::outcome::AttemptError;
use crate::domain::tier::{ConfigError, TierConfig, TierKey, TierScope};
use crate::domain::window::{EventLog, QuotaSnapshot};
use crate::infrastructure::cache::{CacheEntry, CounterCache};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::memory_store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

/// How often the periodic sweep runs, in limiter calls.
const DEFAULT_SWEEP_EVERY: u64 = 64;

/// Multi-tier sliding-window rate limiter.
///
/// # Examples
///
/// ```
/// use action_throttle::{Limiter, TierConfig, TierScope, Identity};
/// use std::time::Duration;
///
/// let limiter = Limiter::new(vec![
///     TierConfig::new(TierScope::PerIdentityAction, Duration::from_secs(60), 3),
/// ])
/// .unwrap();
///
/// let alice = Identity::actor("alice");
/// for _ in 0..3 {
///     assert!(limiter.attempt(&"vote".into(), &alice).is_ok());
/// }
/// let denied = limiter.attempt(&"vote".into(), &alice).unwrap_err();
/// assert!(denied.retry_after().is_some());
/// ```
#[derive(Debug)]
pub struct Limiter<S: RecordStore = MemoryStore> {
    tiers: Vec<TierConfig>,
    cache: CounterCache,
    store: S,
    clock: Arc<dyn Clock>,
    guard: StoreGuard,
    metrics: Metrics,
    sweeper: Sweeper,
}

impl Limiter<MemoryStore> {
    /// Create a limiter over an in-process store with default settings.
    pub fn new(tiers: Vec<TierConfig>) -> Result<Self, ConfigError> {
        Self::builder().with_tiers(tiers).build()
    }

    /// Start building a limiter.
    pub fn builder() -> LimiterBuilder<MemoryStore> {
        LimiterBuilder::new()
    }
}

impl<S: RecordStore> Limiter<S> {
    /// Record an attempt if every applicable tier has capacity.
    ///
    /// On admission returns a fresh quota snapshot per applicable tier, in
    /// evaluation order, reflecting the attempt just recorded. On denial
    /// nothing is recorded and the error names the violating tier and the
    /// delay after which a retry can succeed. Anonymous attempts skip
    /// identity-scoped tiers unless one of them requires an identity.
    pub fn attempt(
        &self,
        action: &ActionType,
        identity: &Identity,
    ) -> Result<Vec<QuotaSnapshot>, AttemptError> {
        let result = self.attempt_inner(action, identity);
        match &result {
            Ok(_) => self.metrics.record_allowed(),
            Err(error) => {
                self.metrics.record_denied();
                tracing::debug!(action = %action, %error, "attempt denied");
            }
        }
        self.maybe_sweep();
        result
    }

    fn attempt_inner(
        &self,
        action: &ActionType,
        identity: &Identity,
    ) -> Result<Vec<QuotaSnapshot>, AttemptError> {
        if identity.is_anonymous() && self.identity_mandatory() {
            return Err(AttemptError::IdentityRequired);
        }

        let now = self.clock.now_ms();
        let groups = self.resolve_keys(action, identity);
        let mut appended: Vec<&TierKey> = Vec::with_capacity(groups.len());
        let mut snapshots = Vec::new();

        for (key, tiers) in &groups {
            let violation = self.cache.with_entry_mut((*key).clone(), |entry| {
                self.ensure_loaded(key, entry, now);
                for tier in tiers {
                    if let Some(error) = Self::violation(tier, &entry.log, now) {
                        return Some(error);
                    }
                }
                entry.log.append(now);
                entry.last_access = now;
                entry.dirty = true;
                persist_entry(&self.store, &self.guard, &self.metrics, key, entry);
                for tier in tiers {
                    snapshots.push(QuotaSnapshot::compute(tier, &entry.log, now));
                }
                None
            });

            if let Some(error) = violation {
                // A later key denied after earlier keys already recorded the
                // attempt; undo those records so nothing was half-admitted
                for key in appended {
                    self.cache.with_entry_mut(key.clone(), |entry| {
                        entry.log.remove_newest(now);
                        entry.dirty = true;
                        persist_entry(&self.store, &self.guard, &self.metrics, key, entry);
                    });
                }
                return Err(error);
            }
            appended.push(key);
        }

        Ok(snapshots)
    }

    /// Report remaining allowance for every tier applicable to the attempt,
    /// in evaluation order.
    ///
    /// Read-only: querying never consumes quota and repeating a query
    /// returns the same snapshots until time passes or attempts land.
    /// Anonymous queries skip identity-scoped tiers.
    pub fn query_quota(&self, action: &ActionType, identity: &Identity) -> Vec<QuotaSnapshot> {
        let now = self.clock.now_ms();
        let mut snapshots = Vec::new();

        for (key, tiers) in &self.resolve_keys(action, identity) {
            self.cache.with_entry_mut((*key).clone(), |entry| {
                self.ensure_loaded(key, entry, now);
                for tier in tiers {
                    snapshots.push(QuotaSnapshot::compute(tier, &entry.log, now));
                }
            });
        }

        self.maybe_sweep();
        snapshots
    }

    /// Run an eviction sweep now, regardless of cadence.
    pub fn sweep(&self) -> SweepStats {
        self.sweeper.sweep(
            &self.cache,
            &self.store,
            &self.guard,
            &self.metrics,
            self.clock.now_ms(),
        )
    }

    /// The limiter's behavior counters. Cheap to clone.
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// The guard in front of the durable store.
    pub fn store_guard(&self) -> &StoreGuard {
        &self.guard
    }

    /// The durable store backing this limiter.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configured tiers, in the order they were added.
    pub fn tiers(&self) -> &[TierConfig] {
        &self.tiers
    }

    /// Number of keys currently held in the volatile cache.
    pub fn tracked_keys(&self) -> usize {
        self.cache.len()
    }

    /// Group applicable tiers by counting key, broadest scope first. Tiers
    /// sharing a scope share a key and a record list.
    fn resolve_keys(
        &self,
        action: &ActionType,
        identity: &Identity,
    ) -> Vec<(TierKey, Vec<&TierConfig>)> {
        let mut groups = Vec::new();
        for scope in TierScope::EVALUATION_ORDER {
            let tiers: Vec<&TierConfig> =
                self.tiers.iter().filter(|t| t.scope == scope).collect();
            if tiers.is_empty() {
                continue;
            }
            if let Some(key) = scope.key_for(action, identity) {
                groups.push((key, tiers));
            }
        }
        groups
    }

    fn identity_mandatory(&self) -> bool {
        self.tiers.iter().any(|tier| tier.require_identity)
    }

    fn violation(tier: &TierConfig, log: &EventLog, now: u64) -> Option<AttemptError> {
        let window_ms = tier.window_ms();
        if log.count_in_window(now, window_ms) < tier.max_events {
            return None;
        }
        // Capacity returns when the oldest counted record leaves the window.
        // With a zero-event tier nothing is counted; the window length is the
        // honest answer
        let retry_ms = log
            .oldest_in_window(now, window_ms)
            .map_or(window_ms, |oldest| (oldest + window_ms).saturating_sub(now));
        Some(AttemptError::limit_exceeded(
            tier.scope,
            Duration::from_millis(retry_ms),
        ))
    }

    /// Pull the key's history from the durable store into the cache entry.
    /// Runs under the entry's lock.
    fn ensure_loaded(&self, key: &TierKey, entry: &mut CacheEntry, now: u64) {
        entry.last_access = now;
        if entry.loaded || !self.guard.allow_request() {
            return;
        }
        match self.store.load(key) {
            Ok(records) => {
                self.guard.record_success();
                if entry.dirty {
                    // Records admitted while the store was unreachable never
                    // made it into the loaded list; fold the store's copy in
                    // instead of replacing them
                    entry.log.merge_records(records);
                } else {
                    entry.log = EventLog::from_records(records);
                }
                entry.loaded = true;
            }
            Err(StoreError::Corrupt(detail)) => {
                // The backend answered, so the guard stays closed; the bad
                // value is dropped, unsaved cache records stay counted, and
                // the next save replaces the stored data
                self.guard.record_success();
                self.metrics.record_store_failure();
                tracing::warn!(%key, detail, "discarding unreadable persisted records");
                entry.loaded = true;
                entry.dirty = true;
            }
            Err(StoreError::Unavailable(detail)) => {
                self.guard.record_failure();
                self.metrics.record_store_failure();
                tracing::warn!(%key, detail, "store read failed, using cached records only");
            }
        }
    }

    fn maybe_sweep(&self) {
        if self.sweeper.should_sweep() {
            self.sweep();
        }
    }
}

/// Write a cache entry's record list through to the durable store.
///
/// Failures are absorbed: the entry stays dirty and a later call or sweep
/// retries. Must run under the entry's lock.
pub(crate) fn persist_entry<S: RecordStore>(
    store: &S,
    guard: &StoreGuard,
    metrics: &Metrics,
    key: &TierKey,
    entry: &mut CacheEntry,
) {
    if !guard.allow_request() {
        entry.dirty = true;
        return;
    }
    match store.save(key, entry.log.records()) {
        Ok(()) => {
            guard.record_success();
            entry.dirty = false;
        }
        Err(error) => {
            guard.record_failure();
            metrics.record_store_failure();
            entry.dirty = true;
            tracing::warn!(%key, %error, "store write failed, will retry on a later call");
        }
    }
}

/// Builder for [`Limiter`].
#[derive(Debug)]
pub struct LimiterBuilder<S: RecordStore> {
    tiers: Vec<TierConfig>,
    store: S,
    clock: Arc<dyn Clock>,
    sweep_every: u64,
    guard_config: StoreGuardConfig,
}

impl LimiterBuilder<MemoryStore> {
    /// Start with an in-process store, the system clock, and default
    /// sweep cadence.
    pub fn new() -> Self {
        Self {
            tiers: Vec::new(),
            store: MemoryStore::new(),
            clock: Arc::new(SystemClock::new()),
            sweep_every: DEFAULT_SWEEP_EVERY,
            guard_config: StoreGuardConfig::default(),
        }
    }
}

impl Default for LimiterBuilder<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RecordStore> LimiterBuilder<S> {
    /// Add one tier.
    pub fn with_tier(mut self, tier: TierConfig) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Add several tiers.
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = TierConfig>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    /// Use a different durable store.
    pub fn with_store<T: RecordStore>(self, store: T) -> LimiterBuilder<T> {
        LimiterBuilder {
            tiers: self.tiers,
            store,
            clock: self.clock,
            sweep_every: self.sweep_every,
            guard_config: self.guard_config,
        }
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sweep expired records every `every` limiter calls. Zero disables
    /// periodic sweeping; explicit [`Limiter::sweep`] still works.
    pub fn with_sweep_every(mut self, every: u64) -> Self {
        self.sweep_every = every;
        self
    }

    /// Tune the guard in front of the durable store.
    pub fn with_guard_config(mut self, config: StoreGuardConfig) -> Self {
        self.guard_config = config;
        self
    }

    /// Validate the tier set and build the limiter.
    ///
    /// A limiter with no tiers admits every attempt.
    pub fn build(self) -> Result<Limiter<S>, ConfigError> {
        for tier in &self.tiers {
            tier.validate()?;
        }
        let sweeper = Sweeper::new(&self.tiers, self.sweep_every);
        // The guard shares the limiter's clock so recovery timing follows
        // the same time source as window counting
        let guard = StoreGuard::with_clock(self.guard_config, Arc::clone(&self.clock));
        tracing::debug!(tiers = self.tiers.len(), "limiter built");
        Ok(Limiter {
            tiers: self.tiers,
            cache: CounterCache::new(),
            store: self.store,
            clock: self.clock,
            guard,
            metrics: Metrics::new(),
            sweeper,
        })
    }
}
