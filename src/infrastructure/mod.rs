//! Infrastructure layer - concrete adapters for the application ports.
//!
//! Provides the volatile counter cache, the system clock, the in-process
//! record store, and optionally a Redis-backed store for sharing quota
//! state across instances.

pub mod cache;
pub mod clock;
pub mod memory_store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;

#[cfg(feature = "redis-storage")]
pub mod redis_store;

pub use clock::SystemClock;
pub use memory_store::MemoryStore;

#[cfg(feature = "redis-storage")]
pub use redis_store::{RedisRecordStore, RedisRecordStoreConfig};
