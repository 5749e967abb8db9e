//! Integration tests for degraded operation when the durable store fails.

use action_throttle::infrastructure::mocks::{FaultInjectingStore, MockClock};
use action_throttle::{
    GuardState, Identity, Limiter, RecordStore, StoreGuardConfig, TierConfig, TierKey, TierScope,
};
use std::sync::Arc;
use std::time::Duration;

const T0: u64 = 1_700_000_000_000;

fn limiter_with_store(
    tiers: Vec<TierConfig>,
    clock: &MockClock,
    store: Arc<FaultInjectingStore>,
    guard: StoreGuardConfig,
) -> Limiter<Arc<FaultInjectingStore>> {
    // This suite drives the degraded-mode warning paths; surface them with
    // the test runner's captured output
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Limiter::builder()
        .with_tiers(tiers)
        .with_clock(clock.clone())
        .with_store(store)
        .with_guard_config(guard)
        .with_sweep_every(0)
        .build()
        .unwrap()
}

#[test]
fn test_attempts_never_fail_because_of_storage() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_fail_loads(true);
    store.set_fail_saves(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(60),
            3,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig::default(),
    );
    let u1 = Identity::actor("u1");

    // Limits are still enforced on cached state alone
    for _ in 0..3 {
        assert!(limiter.attempt(&"vote".into(), &u1).is_ok());
    }
    let err = limiter.attempt(&"vote".into(), &u1).unwrap_err();
    assert_eq!(err.violating_scope(), Some(TierScope::PerIdentity));

    assert!(limiter.metrics().store_failures() > 0);
}

#[test]
fn test_unsaved_changes_flush_when_the_store_recovers() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(600),
            10,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig::default(),
    );
    let u1 = Identity::actor("u1");
    let key = TierKey::new(TierScope::PerIdentity, "u1");

    limiter.attempt(&"vote".into(), &u1).unwrap();
    assert_eq!(store.inner().records(&key), vec![T0]);

    // The store goes down; admissions continue but nothing new lands
    store.set_fail_saves(true);
    clock.advance(Duration::from_secs(1));
    limiter.attempt(&"vote".into(), &u1).unwrap();
    assert_eq!(store.inner().records(&key), vec![T0]);

    // On recovery the next admission writes the full list through
    store.set_fail_saves(false);
    clock.advance(Duration::from_secs(1));
    limiter.attempt(&"vote".into(), &u1).unwrap();
    assert_eq!(
        store.inner().records(&key),
        vec![T0, T0 + 1_000, T0 + 2_000]
    );
}

#[test]
fn test_corrupt_records_restart_as_empty_history() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    let key = TierKey::new(TierScope::PerIdentity, "u1");
    store.inner().save(&key, &[T0 - 10_000]).unwrap();

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(60),
            1,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig::default(),
    );
    let u1 = Identity::actor("u1");

    // The unreadable history is discarded, so the attempt is admitted even
    // though the (unreadable) stored record would have denied it
    store.set_corrupt_loads(true);
    assert!(limiter.attempt(&"vote".into(), &u1).is_ok());

    // The save that followed the admission replaced the bad data
    store.set_corrupt_loads(false);
    assert_eq!(store.inner().records(&key), vec![T0]);

    // And the rebuilt history is live
    assert!(limiter.attempt(&"vote".into(), &u1).is_err());
}

#[test]
fn test_corruption_does_not_open_the_guard() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_corrupt_loads(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(60),
            100,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig {
            failure_threshold: 2,
            retry_interval: Duration::from_secs(60),
        },
    );

    for i in 0..10 {
        let id = Identity::actor(format!("u{i}"));
        limiter.attempt(&"vote".into(), &id).unwrap();
    }

    // The backend kept answering; cache-only mode is for unavailability
    assert_eq!(limiter.store_guard().state(), GuardState::Closed);
}

#[test]
fn test_guard_opens_and_stops_calling_a_failing_store() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_fail_loads(true);
    store.set_fail_saves(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(60),
            100,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig {
            failure_threshold: 3,
            retry_interval: Duration::from_secs(300),
        },
    );
    let u1 = Identity::actor("u1");

    // Each early attempt hits the store and fails until the guard opens
    for _ in 0..3 {
        limiter.attempt(&"vote".into(), &u1).unwrap();
    }
    assert_eq!(limiter.store_guard().state(), GuardState::Open);

    // Once open, admission makes no store calls at all
    let calls_before = store.load_calls() + store.save_calls();
    for _ in 0..10 {
        limiter.attempt(&"vote".into(), &u1).unwrap();
    }
    assert_eq!(store.load_calls() + store.save_calls(), calls_before);
}

#[test]
fn test_guard_probes_and_closes_after_recovery() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_fail_saves(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(600),
            100,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig {
            failure_threshold: 1,
            retry_interval: Duration::from_millis(50),
        },
    );
    let u1 = Identity::actor("u1");
    let key = TierKey::new(TierScope::PerIdentity, "u1");

    limiter.attempt(&"vote".into(), &u1).unwrap();
    assert_eq!(limiter.store_guard().state(), GuardState::Open);

    store.set_fail_saves(false);

    // The guard runs on the limiter's clock: once the retry interval has
    // passed, the next call probes the store, succeeds, and closes the guard
    clock.advance(Duration::from_secs(1));
    limiter.attempt(&"vote".into(), &u1).unwrap();
    assert_eq!(limiter.store_guard().state(), GuardState::Closed);
    assert_eq!(store.inner().records(&key), vec![T0, T0 + 1_000]);
}

#[test]
fn test_records_admitted_during_outage_survive_store_recovery() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_fail_loads(true);
    store.set_fail_saves(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(600),
            3,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig {
            failure_threshold: 2,
            retry_interval: Duration::from_secs(30),
        },
    );
    let u1 = Identity::actor("u1");
    let key = TierKey::new(TierScope::PerIdentity, "u1");

    // The whole quota is consumed while the store is down
    for _ in 0..3 {
        assert!(limiter.attempt(&"vote".into(), &u1).is_ok());
        clock.advance(Duration::from_secs(1));
    }
    assert!(limiter.attempt(&"vote".into(), &u1).is_err());

    // The store comes back and the guard's retry interval passes. The load
    // that follows must not wipe the records the store never received
    store.set_fail_loads(false);
    store.set_fail_saves(false);
    clock.advance(Duration::from_secs(31));

    let err = limiter.attempt(&"vote".into(), &u1).unwrap_err();
    assert_eq!(err.violating_scope(), Some(TierScope::PerIdentity));
    assert_eq!(limiter.store_guard().state(), GuardState::Closed);

    // Once the oldest record expires, the admission that follows flushes the
    // outage-era records through to the store
    clock.set_ms(T0 + 600_001);
    assert!(limiter.attempt(&"vote".into(), &u1).is_ok());
    assert_eq!(
        store.inner().records(&key),
        vec![T0, T0 + 1_000, T0 + 2_000, T0 + 600_001]
    );
}

#[test]
fn test_corrupt_store_value_does_not_erase_unsaved_records() {
    let clock = MockClock::new(T0);
    let store = Arc::new(FaultInjectingStore::new());
    store.set_fail_loads(true);
    store.set_fail_saves(true);

    let limiter = limiter_with_store(
        vec![TierConfig::new(
            TierScope::PerIdentity,
            Duration::from_secs(600),
            2,
        )],
        &clock,
        Arc::clone(&store),
        StoreGuardConfig {
            failure_threshold: 1,
            retry_interval: Duration::from_secs(30),
        },
    );
    let u1 = Identity::actor("u1");

    assert!(limiter.attempt(&"vote".into(), &u1).is_ok());
    clock.advance(Duration::from_secs(1));
    assert!(limiter.attempt(&"vote".into(), &u1).is_ok());
    assert!(limiter.attempt(&"vote".into(), &u1).is_err());

    // The store answers again but with an unreadable value; discarding it
    // must not discard the unsaved cache records with it
    store.set_fail_loads(false);
    store.set_fail_saves(false);
    store.set_corrupt_loads(true);
    clock.advance(Duration::from_secs(31));

    assert!(limiter.attempt(&"vote".into(), &u1).is_err());
    assert_eq!(limiter.store_guard().state(), GuardState::Closed);
}
