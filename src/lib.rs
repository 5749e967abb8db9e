//! # action-throttle
//!
//! Multi-tier sliding-window rate limiting and quota tracking for gated
//! user actions.
//!
//! An attempt is a `(action type, identity)` pair. The limiter evaluates
//! every configured tier against it, broadest scope first, and admits the
//! attempt only when all applicable tiers have capacity. Counting uses an
//! exact log of accepted-attempt timestamps per key, so a denied key
//! recovers capacity at the exact moment its oldest record leaves the
//! window, with no fixed-bucket boundary bursts.
//!
//! ## Quick Start
//!
//! ```rust
//! use action_throttle::{Limiter, TierConfig, TierScope, Identity};
//! use std::time::Duration;
//!
//! // 5 votes per minute per user, 200 votes per minute across all users
//! let limiter = Limiter::builder()
//!     .with_tier(TierConfig::new(TierScope::PerIdentityAction, Duration::from_secs(60), 5))
//!     .with_tier(TierConfig::new(TierScope::PerAction, Duration::from_secs(60), 200))
//!     .build()
//!     .unwrap();
//!
//! let alice = Identity::actor("alice");
//! match limiter.attempt(&"vote".into(), &alice) {
//!     Ok(quotas) => { /* perform the action; quotas hold remaining allowance */ }
//!     Err(denied) => {
//!         // denied.retry_after() says when a retry can succeed
//!     }
//! }
//!
//! // Read-only view of remaining allowance, e.g. for response headers
//! let quota = limiter.query_quota(&"vote".into(), &alice);
//! ```
//!
//! ## Features
//!
//! ### Tier Scopes
//! - **Global**: one shared budget across every actor and action
//! - **PerIdentity**: one budget per actor, across all actions
//! - **PerAction**: one budget per action type, across all actors
//! - **PerIdentityAction**: one budget per actor per action type
//!
//! Several tiers may share a scope (a burst window plus a daily window);
//! they then count against the same record list. Anonymous attempts skip
//! identity-scoped tiers unless a tier marks the identity as required.
//!
//! ### Storage
//! - **In-process** (default): a concurrent map, durable for the process
//!   lifetime
//! - **Redis** (`redis-storage` feature): shared record lists across
//!   instances, with TTL-based expiry
//!
//! The durable store is an extension of the in-process cache, never a
//! gatekeeper: when it fails, admission continues on cached state and
//! unsaved changes are retried later. A guard stops hammering a backend
//! that keeps failing and probes it again after a recovery interval.
//!
//! ### Other Features
//! - **Exact retry delays**: every denial reports when a retry can succeed
//! - **Idempotent quota queries**: reading remaining allowance consumes
//!   nothing
//! - **Periodic eviction**: expired records and dead keys are swept out on
//!   a call-count cadence
//! - **Observability counters**: admitted, denied, evicted, and absorbed
//!   store failures
//!
//! ## Architecture
//!
//! The crate follows a hexagonal layout:
//! - [`domain`]: tier configuration, key derivation, the sliding-window
//!   record log, attempt outcomes
//! - [`application`]: the limiter, its ports ([`Clock`], [`RecordStore`]),
//!   the eviction sweeper, the store guard, metrics
//! - [`infrastructure`]: the counter cache, system clock, and store
//!   adapters

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::guard::{GuardState, StoreGuard, StoreGuardConfig};
pub use application::limiter::{Limiter, LimiterBuilder};
pub use application::metrics::{Metrics, MetricsSnapshot};
pub use application::ports::{Clock, RecordStore, StoreError};
pub use application::sweeper::SweepStats;
pub use domain::action::{ActionType, Identity};
pub use domain::outcome::AttemptError;
pub use domain::tier::{ConfigError, TierConfig, TierKey, TierScope};
pub use domain::window::QuotaSnapshot;
pub use infrastructure::clock::SystemClock;
pub use infrastructure::memory_store::MemoryStore;

#[cfg(feature = "redis-storage")]
pub use infrastructure::redis_store::{RedisRecordStore, RedisRecordStoreConfig};
