//! Fault-injecting record store for testing degraded operation.

use crate::application::ports::{RecordStore, StoreError};
use crate::domain::tier::TierKey;
use crate::infrastructure::memory_store::MemoryStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Record store wrapping a [`MemoryStore`] with switchable fault modes.
///
/// Lets tests verify that the limiter absorbs storage faults: reads and
/// writes can be made to fail as unavailable, and reads can be made to
/// report corrupt data, all toggled at runtime. Call counters expose how
/// often the limiter actually reached for the store.
#[derive(Debug, Default)]
pub struct FaultInjectingStore {
    inner: MemoryStore,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    corrupt_loads: AtomicBool,
    load_calls: AtomicU64,
    save_calls: AtomicU64,
}

impl FaultInjectingStore {
    /// Create a healthy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent loads fail as `StoreError::Unavailable`.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent saves fail as `StoreError::Unavailable`.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent loads fail as `StoreError::Corrupt`.
    pub fn set_corrupt_loads(&self, corrupt: bool) {
        self.corrupt_loads.store(corrupt, Ordering::SeqCst);
    }

    /// How many loads the limiter attempted, failed or not.
    pub fn load_calls(&self) -> u64 {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// How many saves the limiter attempted, failed or not.
    pub fn save_calls(&self) -> u64 {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// The backing store, for seeding and inspecting records directly.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl RecordStore for FaultInjectingStore {
    fn load(&self, key: &TierKey) -> Result<Vec<u64>, StoreError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.corrupt_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("injected corrupt read".to_string()));
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected load failure".to_string()));
        }
        self.inner.load(key)
    }

    fn save(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        self.inner.save(key, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::TierScope;

    fn key() -> TierKey {
        TierKey::new(TierScope::Global, "*")
    }

    #[test]
    fn test_healthy_by_default() {
        let store = FaultInjectingStore::new();
        store.save(&key(), &[1, 2]).unwrap();
        assert_eq!(store.load(&key()).unwrap(), vec![1, 2]);
        assert_eq!(store.load_calls(), 1);
        assert_eq!(store.save_calls(), 1);
    }

    #[test]
    fn test_injected_load_failure() {
        let store = FaultInjectingStore::new();
        store.set_fail_loads(true);
        assert!(matches!(
            store.load(&key()),
            Err(StoreError::Unavailable(_))
        ));

        store.set_fail_loads(false);
        assert!(store.load(&key()).is_ok());
    }

    #[test]
    fn test_injected_corrupt_read_preserves_underlying_data() {
        let store = FaultInjectingStore::new();
        store.save(&key(), &[5]).unwrap();

        store.set_corrupt_loads(true);
        assert!(matches!(store.load(&key()), Err(StoreError::Corrupt(_))));

        store.set_corrupt_loads(false);
        assert_eq!(store.load(&key()).unwrap(), vec![5]);
    }

    #[test]
    fn test_injected_save_failure_leaves_store_untouched() {
        let store = FaultInjectingStore::new();
        store.set_fail_saves(true);
        assert!(store.save(&key(), &[1]).is_err());
        assert!(store.inner().is_empty());
    }
}
