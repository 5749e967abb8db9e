//! Fail-open guard around the durable store.
//!
//! A breaker in front of every store read and write: after a run of
//! consecutive failures the guard opens and the limiter stops calling the
//! store entirely, operating on the volatile cache alone. After a recovery
//! interval one probe call is let through; success closes the guard, failure
//! reopens it. Admission decisions are never blocked on a failing backend.
//!
//! Recovery timing runs on the same [`Clock`] port as window counting, so
//! tests drive the retry interval with a mock clock.

use crate::application::ports::Clock;
use crate::infrastructure::clock::SystemClock;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Guard states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Store is healthy, all calls go through
    Closed = 0,
    /// Store is skipped, the limiter runs cache-only
    Open = 1,
    /// One probe call is allowed to test recovery
    HalfOpen = 2,
}

impl From<u8> for GuardState {
    fn from(value: u8) -> Self {
        match value {
            0 => GuardState::Closed,
            1 => GuardState::Open,
            2 => GuardState::HalfOpen,
            _ => GuardState::Closed,
        }
    }
}

/// Configuration for store-guard behavior.
#[derive(Debug, Clone)]
pub struct StoreGuardConfig {
    /// Consecutive failures before the store is skipped
    pub failure_threshold: u32,
    /// How long to run cache-only before probing the store again
    pub retry_interval: Duration,
}

impl Default for StoreGuardConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            retry_interval: Duration::from_secs(30),
        }
    }
}

/// Breaker protecting admission calls from a failing durable store.
#[derive(Debug)]
pub struct StoreGuard {
    state: AtomicU8,
    consecutive_failures: AtomicU64,
    /// Epoch milliseconds of the most recent failure
    last_failure_ms: AtomicU64,
    config: StoreGuardConfig,
    clock: Arc<dyn Clock>,
}

impl StoreGuard {
    /// Create a guard with default configuration on the system clock.
    pub fn new() -> Self {
        Self::with_config(StoreGuardConfig::default())
    }

    /// Create a guard with custom configuration on the system clock.
    pub fn with_config(config: StoreGuardConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a guard driven by an injected clock.
    pub fn with_clock(config: StoreGuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: AtomicU8::new(GuardState::Closed as u8),
            consecutive_failures: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            config,
            clock,
        }
    }

    /// Get the current guard state.
    pub fn state(&self) -> GuardState {
        GuardState::from(self.state.load(Ordering::Acquire))
    }

    /// Check whether a store call should be made.
    ///
    /// Returns `false` while the guard is open; the caller then proceeds on
    /// the volatile cache alone.
    pub fn allow_request(&self) -> bool {
        match self.state() {
            GuardState::Closed => true,
            GuardState::Open => {
                let now = self.clock.now_ms();
                let last_failure = self.last_failure_ms.load(Ordering::Acquire);
                let retry_ms = self.config.retry_interval.as_millis() as u64;

                if now.saturating_sub(last_failure) >= retry_ms {
                    // Only one thread wins the transition to HalfOpen and
                    // issues the probe call
                    let result = self.state.compare_exchange(
                        GuardState::Open as u8,
                        GuardState::HalfOpen as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    result.is_ok() || self.state() == GuardState::HalfOpen
                } else {
                    false
                }
            }
            GuardState::HalfOpen => true,
        }
    }

    /// Record a successful store call.
    pub fn record_success(&self) {
        match self.state() {
            GuardState::HalfOpen => {
                self.consecutive_failures.store(0, Ordering::Release);
                self.state
                    .store(GuardState::Closed as u8, Ordering::Release);
                tracing::debug!("durable store recovered, leaving cache-only mode");
            }
            GuardState::Closed => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
            GuardState::Open => {}
        }
    }

    /// Record a failed store call.
    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_failure_ms
            .store(self.clock.now_ms(), Ordering::Release);

        match self.state() {
            GuardState::HalfOpen => {
                self.state.store(GuardState::Open as u8, Ordering::Release);
            }
            GuardState::Closed => {
                if failures >= u64::from(self.config.failure_threshold) {
                    self.state.store(GuardState::Open as u8, Ordering::Release);
                    tracing::warn!(
                        failures,
                        "durable store failing repeatedly, switching to cache-only mode"
                    );
                }
            }
            GuardState::Open => {}
        }
    }

    /// Get the number of consecutive failures.
    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Force the guard back to closed.
    pub fn reset(&self) {
        self.state
            .store(GuardState::Closed as u8, Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Release);
    }
}

impl Default for StoreGuard {
    fn default() -> Self {
        Self::new()
    }
}
