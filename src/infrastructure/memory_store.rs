//! In-process durable-store adapter.
//!
//! Backs the `RecordStore` port with a DashMap. This is the default backend:
//! durable for the lifetime of the process, which matches the advisory nature
//! of the limiter, and the reference implementation the integration tests
//! run against. Wrap it in an `Arc` to observe store contents from outside
//! a limiter.

use crate::application::ports::{RecordStore, StoreError};
use crate::domain::tier::TierKey;
use dashmap::DashMap;

/// DashMap-backed record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: DashMap<TierKey, Vec<u64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with at least one record.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &TierKey) -> bool {
        self.map.contains_key(key)
    }

    /// Read a key's records directly, bypassing the port. Test support.
    pub fn records(&self, key: &TierKey) -> Vec<u64> {
        self.map.get(key).map(|r| r.clone()).unwrap_or_default()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, key: &TierKey) -> Result<Vec<u64>, StoreError> {
        // Absent key is "no history", never an error
        Ok(self.map.get(key).map(|r| r.clone()).unwrap_or_default())
    }

    fn save(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError> {
        if records.is_empty() {
            self.map.remove(key);
        } else {
            self.map.insert(key.clone(), records.to_vec());
        }
        Ok(())
    }
}
