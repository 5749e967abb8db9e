//! Redis-backed record store.
//!
//! Lets multiple application instances count against the same record lists.
//! One Redis string per `(scope, key)` pair, value bincode-encoded, with a
//! TTL so keys for actors that never return expire on their own.
//!
//! The TTL must be at least as long as the longest configured window or
//! live records can vanish early; the one-day default covers daily quotas.
//!
//! The sync [`RecordStore`] trait is bridged onto async Redis operations:
//! inside a tokio runtime the call blocks in place, outside one a throwaway
//! runtime drives the operation. Every operation carries a timeout so a
//! stalled Redis degrades the limiter instead of wedging admission calls.
//!
//! ## Example
//!
//! ```rust,ignore
//! use action_throttle::{Limiter, TierConfig, TierScope};
//! use action_throttle::infrastructure::redis_store::RedisRecordStore;
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() {
//!     let store = RedisRecordStore::connect("redis://127.0.0.1/")
//!         .await
//!         .expect("redis connection");
//!
//!     let limiter = Limiter::builder()
//!         .with_tier(TierConfig::new(TierScope::PerIdentity, Duration::from_secs(60), 30))
//!         .with_store(store)
//!         .build()
//!         .unwrap();
//! }
//! ```

use crate::application::ports::{RecordStore, StoreError};
use crate::domain::tier::TierKey;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Wire form of one record list.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecords {
    records: Vec<u64>,
}

/// Configuration for the Redis record store.
#[derive(Debug, Clone)]
pub struct RedisRecordStoreConfig {
    /// Expiry for untouched keys (default: 1 day)
    pub ttl: Duration,
    /// Prefix for Redis keys (default: "action-throttle:")
    pub key_prefix: String,
    /// Per-operation timeout (default: 2 seconds)
    pub op_timeout: Duration,
}

impl Default for RedisRecordStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            key_prefix: "action-throttle:".to_string(),
            op_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisRecordStoreConfig {
    fn redis_key(&self, key: &TierKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

/// Redis-backed store for distributed quota tracking.
pub struct RedisRecordStore {
    connection: Arc<RwLock<ConnectionManager>>,
    config: RedisRecordStoreConfig,
}

impl fmt::Debug for RedisRecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Clone for RedisRecordStore {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            config: self.config.clone(),
        }
    }
}

impl RedisRecordStore {
    /// Connect to Redis with default configuration.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        Self::connect_with_config(url, RedisRecordStoreConfig::default()).await
    }

    /// Connect to Redis with custom configuration.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect_with_config(
        url: &str,
        config: RedisRecordStoreConfig,
    ) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection: Arc::new(RwLock::new(connection)),
            config,
        })
    }

    async fn get(&self, key: &TierKey) -> Result<Vec<u64>, StoreError> {
        let redis_key = self.config.redis_key(key);
        let mut conn = self.connection.write().await;

        let bytes: Option<Vec<u8>> = with_timeout(
            self.config.op_timeout,
            conn.get(&redis_key),
        )
        .await?;

        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => match bincode::deserialize::<StoredRecords>(&bytes) {
                Ok(stored) => Ok(stored.records),
                Err(error) => {
                    // Delete the bad value so the key self-heals; the caller
                    // restarts the key's history regardless
                    let _: Result<(), StoreError> =
                        with_timeout(self.config.op_timeout, conn.del(&redis_key)).await;
                    Err(StoreError::Corrupt(error.to_string()))
                }
            },
        }
    }

    async fn set(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError> {
        let redis_key = self.config.redis_key(key);
        let mut conn = self.connection.write().await;

        if records.is_empty() {
            return with_timeout(self.config.op_timeout, conn.del(&redis_key)).await;
        }

        let stored = StoredRecords {
            records: records.to_vec(),
        };
        let bytes =
            bincode::serialize(&stored).map_err(|error| StoreError::Corrupt(error.to_string()))?;
        with_timeout(
            self.config.op_timeout,
            conn.set_ex(&redis_key, bytes, self.config.ttl.as_secs()),
        )
        .await
    }

    fn block_on<F, T>(future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(future))
        } else {
            let runtime = tokio::runtime::Runtime::new().map_err(|error| {
                StoreError::Unavailable(format!("failed to create runtime: {error}"))
            })?;
            runtime.block_on(future)
        }
    }
}

async fn with_timeout<F, T>(timeout: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(StoreError::Unavailable(error.to_string())),
        Err(_) => Err(StoreError::Unavailable("operation timed out".to_string())),
    }
}

impl RecordStore for RedisRecordStore {
    fn load(&self, key: &TierKey) -> Result<Vec<u64>, StoreError> {
        Self::block_on(self.get(key))
    }

    fn save(&self, key: &TierKey, records: &[u64]) -> Result<(), StoreError> {
        Self::block_on(self.set(key, records))
    }
}
