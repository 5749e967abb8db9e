//! Volatile counter cache.
//!
//! In-process mirror of recently-touched record lists, backed by DashMap.
//! DashMap provides lock-free reads and fine-grained locking for writes; the
//! per-entry lock taken by [`CounterCache::with_entry_mut`] doubles as the
//! admission critical section for that key, so reading the count, comparing
//! it to the threshold, and appending the new record happen atomically
//! per key.
//!
//! The cache is an optimization only: it starts empty on process restart and
//! is transparently repopulated from the durable store.

use crate::domain::tier::TierKey;
use crate::domain::window::EventLog;
use dashmap::DashMap;

/// Cached state for one `(scope, key)` pair.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// The record list as this process last saw it
    pub log: EventLog,
    /// Whether the durable store has been consulted for this key
    pub loaded: bool,
    /// Whether the log has changes the durable store has not accepted yet
    pub dirty: bool,
    /// Epoch milliseconds of the last touch, for diagnostics
    pub last_access: u64,
}

/// Thread-safe cache of record lists keyed by `(scope, key)`.
#[derive(Debug, Default)]
pub struct CounterCache {
    map: DashMap<TierKey, CacheEntry>,
}

impl CounterCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Access an entry with mutable access, creating an empty one if absent.
    ///
    /// The entry's shard lock is held for the duration of `accessor`; this is
    /// the per-key critical section. Never call back into the cache from
    /// inside `accessor`.
    pub fn with_entry_mut<F, R>(&self, key: TierKey, accessor: F) -> R
    where
        F: FnOnce(&mut CacheEntry) -> R,
    {
        let mut entry = self.map.entry(key).or_default();
        accessor(&mut entry)
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop all cached entries. Correctness is unaffected: subsequent calls
    /// fall through to the durable store.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Check whether a key is currently cached.
    pub fn contains_key(&self, key: &TierKey) -> bool {
        self.map.contains_key(key)
    }

    /// Remove entries for which the predicate returns false. The predicate
    /// runs under each entry's lock.
    pub fn retain<F>(&self, f: F)
    where
        F: FnMut(&TierKey, &mut CacheEntry) -> bool,
    {
        self.map.retain(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::TierScope;

    fn key(name: &str) -> TierKey {
        TierKey::new(TierScope::PerAction, name)
    }

    #[test]
    fn test_entry_created_on_first_access() {
        let cache = CounterCache::new();
        assert!(cache.is_empty());

        cache.with_entry_mut(key("vote"), |entry| {
            assert!(!entry.loaded);
            assert!(entry.log.is_empty());
            entry.loaded = true;
        });

        assert_eq!(cache.len(), 1);
        cache.with_entry_mut(key("vote"), |entry| {
            assert!(entry.loaded);
        });
    }

    #[test]
    fn test_entries_are_independent_per_key() {
        let cache = CounterCache::new();
        cache.with_entry_mut(key("vote"), |entry| entry.log.append(1));
        cache.with_entry_mut(key("comment"), |entry| entry.log.append(2));

        cache.with_entry_mut(key("vote"), |entry| {
            assert_eq!(entry.log.records(), &[1]);
        });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_retain_drops_entries() {
        let cache = CounterCache::new();
        cache.with_entry_mut(key("a"), |entry| entry.log.append(1));
        cache.with_entry_mut(key("b"), |_| {});

        cache.retain(|_, entry| !entry.log.is_empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key(&key("a")));
        assert!(!cache.contains_key(&key("b")));
    }

    #[test]
    fn test_clear() {
        let cache = CounterCache::new();
        cache.with_entry_mut(key("a"), |_| {});
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access_to_same_key_serializes() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(CounterCache::new());
        let mut handles = vec![];
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    cache.with_entry_mut(key("shared"), |entry| {
                        entry.log.append(i * 100 + j);
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        cache.with_entry_mut(key("shared"), |entry| {
            assert_eq!(entry.log.len(), 800);
        });
    }
}
