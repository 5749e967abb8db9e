//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::tier::TierKey;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Port for obtaining current time as epoch milliseconds.
///
/// This abstraction allows the application layer to work with time without
/// depending on the system clock. Infrastructure provides concrete
/// implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Failure of a durable-store operation.
///
/// Both kinds are recovered inside the limiter: `Unavailable` degrades the
/// call to cache-only semantics, `Corrupt` degrades the key to empty history.
/// Neither is ever surfaced to the caller of `attempt`/`query_quota`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or the operation timed out.
    Unavailable(String),
    /// Persisted data for the key exists but could not be parsed.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(detail) => write!(f, "durable store unavailable: {detail}"),
            StoreError::Corrupt(detail) => write!(f, "persisted records corrupt: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Port for durable, append-friendly record storage.
///
/// One ordered list of epoch-millisecond timestamps per `(scope, key)`.
/// The limiter is agnostic to the concrete backend (in-process map, file,
/// embedded KV, remote cache).
pub trait RecordStore: Send + Sync + Debug {
    /// Load the record list for a key.
    ///
    /// An absent key is not an error: implementations return an empty list.
    /// Implementations should also self-heal unparsable data where they can;
    /// when they cannot, they return `StoreError::Corrupt` and the limiter
    /// treats the key as having no history.
    fn load(&self, key: &TierKey) -> Result<Vec<u64>, StoreError>;

    /// Replace the record list for a key.
    ///
    /// Saving an empty list removes the key entirely.
    fn save(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn load(&self, key: &TierKey) -> Result<Vec<u64>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError> {
        (**self).save(key, records)
    }
}
