//! Per-partition in-memory aggregate counters
//!
//! Each delivered event bumps eight pending counters, one per dimension
//! combination (see [`crate::keys`]). The flusher periodically swaps the
//! whole map out and merges it into the store, so accumulation and flushing
//! never wait on each other for longer than one map swap.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::mem;

use tagstore_core::Event;

use crate::keys::event_bucket_keys;

/// Pending `(count, sum_price)` for one bucket key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    /// Number of events
    pub count: i64,
    /// Sum of prices
    pub sum_price: i64,
}

impl Counter {
    /// Counter for one event of the given price
    pub fn single(price: i64) -> Self {
        Self {
            count: 1,
            sum_price: price,
        }
    }

    /// Fold another counter into this one
    pub fn merge(&mut self, other: Counter) {
        self.count = self.count.saturating_add(other.count);
        self.sum_price = self.sum_price.saturating_add(other.sum_price);
    }
}

/// Pending counters owned by one partition
#[derive(Debug, Default)]
pub struct Accumulator {
    pending: Mutex<FxHashMap<String, Counter>>,
}

impl Accumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one event under every dimension combination of `bucket`.
    ///
    /// `bucket` is the delivery key the event was published under.
    pub fn record(&self, bucket: &str, event: &Event) {
        let delta = Counter::single(event.price());
        let keys = event_bucket_keys(bucket, event);
        let mut pending = self.pending.lock();
        for key in keys {
            pending.entry(key).or_default().merge(delta);
        }
    }

    /// Merge a counter back in, e.g. after a failed flush of that key
    pub fn restore(&self, key: String, counter: Counter) {
        self.pending.lock().entry(key).or_default().merge(counter);
    }

    /// Take every pending counter, leaving the accumulator empty
    pub fn drain(&self) -> FxHashMap<String, Counter> {
        mem::take(&mut *self.pending.lock())
    }

    /// Pending counter for a key
    pub fn get(&self, key: &str) -> Option<Counter> {
        self.pending.lock().get(key).copied()
    }

    /// Number of pending keys
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
