//! Sliding-window record log and derived quota snapshots.
//!
//! The limiter keeps an exact log of accepted-attempt timestamps per key and
//! counts the entries inside a window anchored at the current moment. This is
//! a sliding-window log, not a fixed-bucket counter: fixed buckets admit
//! bursts of twice the limit at bucket boundaries.
//!
//! A record is inside a window of length `W` iff `timestamp > now - W`, so a
//! key recovers capacity exactly at window expiry.

use crate::domain::tier::{TierConfig, TierScope};

/// Ordered list of accepted-attempt timestamps (epoch milliseconds) for one
/// `(scope, key)` pair.
///
/// The only mutations are appending on admission and removing expired
/// entries on pruning or rolled-back entries on a lost admission race.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    records: Vec<u64>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from stored records. Sorts defensively: persisted data may
    /// have been merged out of order.
    pub fn from_records(mut records: Vec<u64>) -> Self {
        records.sort_unstable();
        Self { records }
    }

    /// The retained timestamps, oldest first.
    pub fn records(&self) -> &[u64] {
        &self.records
    }

    /// Number of retained records, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a timestamp, keeping the log sorted.
    pub fn append(&mut self, timestamp: u64) {
        match self.records.last() {
            Some(&last) if last > timestamp => {
                let at = self.records.partition_point(|&ts| ts <= timestamp);
                self.records.insert(at, timestamp);
            }
            _ => self.records.push(timestamp),
        }
    }

    /// Index of the first record inside the window ending at `now`.
    fn window_start_index(&self, now: u64, window_ms: u64) -> usize {
        let cutoff = now.saturating_sub(window_ms);
        self.records.partition_point(|&ts| ts <= cutoff)
    }

    /// Count the records inside the window ending at `now`.
    pub fn count_in_window(&self, now: u64, window_ms: u64) -> usize {
        self.records.len() - self.window_start_index(now, window_ms)
    }

    /// Oldest record still inside the window ending at `now`.
    pub fn oldest_in_window(&self, now: u64, window_ms: u64) -> Option<u64> {
        self.records
            .get(self.window_start_index(now, window_ms))
            .copied()
    }

    /// Drop every record at or before `cutoff`. Returns how many were removed.
    pub fn prune_expired(&mut self, cutoff: u64) -> u64 {
        let at = self.records.partition_point(|&ts| ts <= cutoff);
        self.records.drain(..at);
        at as u64
    }

    /// Fold another record list into this log.
    ///
    /// Used when a store load lands on a key that already holds records the
    /// store never received. A timestamp present in both lists is kept at the
    /// higher of the two multiplicities, so history that was saved earlier is
    /// not double-counted while records unknown to either side all survive.
    pub fn merge_records(&mut self, mut records: Vec<u64>) {
        if records.is_empty() {
            return;
        }
        records.sort_unstable();
        if self.records.is_empty() {
            self.records = records;
            return;
        }
        let mut merged = Vec::with_capacity(self.records.len().max(records.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.records.len() && j < records.len() {
            match self.records[i].cmp(&records[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.records[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(records[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.records[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.records[i..]);
        merged.extend_from_slice(&records[j..]);
        self.records = merged;
    }

    /// Remove the newest record equal to `timestamp`, if any. Used to undo an
    /// append when a concurrent attempt won the admission race on a later key.
    pub fn remove_newest(&mut self, timestamp: u64) -> bool {
        if let Some(at) = self.records.iter().rposition(|&ts| ts == timestamp) {
            self.records.remove(at);
            true
        } else {
            false
        }
    }
}

/// Point-in-time view of remaining allowance for one tier. Derived on demand,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Scope of the tier this snapshot describes
    pub scope: TierScope,
    /// The tier's configured maximum
    pub limit: usize,
    /// Attempts left before the tier denies; never exceeds `limit`
    pub remaining: usize,
    /// Epoch milliseconds at which the oldest counted record leaves the
    /// window; equals the query time when nothing is counted
    pub window_reset_at: u64,
}

impl QuotaSnapshot {
    /// Derive a snapshot for one tier from its record log.
    pub fn compute(tier: &TierConfig, log: &EventLog, now: u64) -> Self {
        let window_ms = tier.window_ms();
        let counted = log.count_in_window(now, window_ms);
        Self {
            scope: tier.scope,
            limit: tier.max_events,
            remaining: tier.max_events.saturating_sub(counted),
            window_reset_at: log
                .oldest_in_window(now, window_ms)
                .map_or(now, |oldest| oldest + window_ms),
        }
    }

    /// Check whether the tier would deny the next attempt.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
