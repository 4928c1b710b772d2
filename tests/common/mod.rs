//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

pub use tagstore::{
    Action, AggregateFilter, Bin, Device, Error, Event, MemoryStore, ProductInfo, Record,
    RecordKey, RecordStore, Result, TagStoreConfig, WritePolicy,
};

// ============================================================================
// Events
// ============================================================================

/// Fixed reference instant, on a minute boundary
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, 22, 12, 25, 0).unwrap()
}

/// `t0` shifted by `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// Builder for test events with sensible defaults
#[derive(Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(cookie: &str, action: Action) -> Self {
        Self {
            event: Event {
                timestamp: t0(),
                visitor_id: cookie.to_string(),
                country: "PL".to_string(),
                device: Device::Pc,
                action,
                origin: Some("o".to_string()),
                product: ProductInfo {
                    product_id: 1,
                    brand_id: "b".to_string(),
                    category_id: "c".to_string(),
                    price: 100,
                },
            },
        }
    }

    pub fn at(mut self, secs: i64) -> Self {
        self.event.timestamp = at(secs);
        self
    }

    pub fn product(mut self, product_id: i64) -> Self {
        self.event.product.product_id = product_id;
        self
    }

    pub fn price(mut self, price: u32) -> Self {
        self.event.product.price = price;
        self
    }

    pub fn origin(mut self, origin: Option<&str>) -> Self {
        self.event.origin = origin.map(str::to_string);
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

pub fn view(cookie: &str, secs: i64) -> Event {
    EventBuilder::new(cookie, Action::View).at(secs).build()
}

pub fn buy(cookie: &str, secs: i64) -> Event {
    EventBuilder::new(cookie, Action::Buy).at(secs).build()
}

/// Config with a flush interval long enough that only explicit flushes and
/// shutdown merge anything
pub fn quiet_config() -> TagStoreConfig {
    TagStoreConfig {
        flush_interval_ms: 60_000,
        ..TagStoreConfig::default()
    }
}

// ============================================================================
// Store helpers
// ============================================================================

/// `(count, sum_price)` of an aggregate bucket, if it exists
pub fn bucket_totals(store: &dyn RecordStore, bucket_key: &str) -> Option<(i64, i64)> {
    let record = store
        .get(&RecordKey::new("tags", "aggregates", bucket_key))
        .unwrap()?;
    Some((record.get_int("count")?, record.get_int("sum_price")?))
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: StdDuration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(StdDuration::from_millis(10));
    }
    cond()
}

// ============================================================================
// FlakyStore - MemoryStore with injectable failures
// ============================================================================

/// Wraps a [`MemoryStore`] and fails selected operations on demand
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    unavailable: AtomicBool,
    failing_add_suffix: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with `StoreUnavailable` while set
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// `add` fails for keys whose user key ends with `suffix`
    pub fn fail_adds_ending_with(&self, suffix: Option<&str>) {
        *self.failing_add_suffix.lock() = suffix.map(str::to_string);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable("injected outage"));
        }
        Ok(())
    }
}

impl RecordStore for FlakyStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        self.check_available()?;
        self.inner.get(key)
    }

    fn put(&self, policy: &WritePolicy, key: &RecordKey, bins: Vec<(String, Bin)>) -> Result<u32> {
        self.check_available()?;
        self.inner.put(policy, key, bins)
    }

    fn add(&self, policy: &WritePolicy, key: &RecordKey, increments: &[(&str, i64)]) -> Result<u32> {
        self.check_available()?;
        if let Some(suffix) = self.failing_add_suffix.lock().as_deref() {
            if key.user_key.ends_with(suffix) {
                return Err(Error::unavailable(format!("injected add failure for {}", key)));
            }
        }
        self.inner.add(policy, key, increments)
    }

    fn delete(&self, key: &RecordKey) -> Result<bool> {
        self.check_available()?;
        self.inner.delete(key)
    }
}
