//! Application layer - orchestrates admission over the domain rules.
//!
//! Contains the limiter itself, the ports it depends on, the eviction
//! sweeper, the guard in front of the durable store, and the behavior
//! counters.

pub mod guard;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod sweeper;

pub use guard::{GuardState, StoreGuard, StoreGuardConfig};
pub use limiter::{Limiter, LimiterBuilder};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{Clock, RecordStore, StoreError};
pub use sweeper::SweepStats;
