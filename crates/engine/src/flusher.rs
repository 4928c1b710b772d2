//! Periodic accumulator-to-store merge
//!
//! This module provides the Flusher that runs in a background thread and
//! periodically drains one accumulator into the shared aggregate buckets.
//!
//! # Design Notes
//!
//! - Swap-and-clear: the whole pending map is taken in one step, so events
//!   recorded during a flush land in the next cycle
//! - One atomic add per bucket covers both `count` and `sum_price`
//! - A failed bucket does not stop the others; its counter goes back into
//!   the accumulator and is retried next cycle
//! - Graceful shutdown via atomic flag, with a final best-effort flush

use std::sync::atomic::{AtomicBool, Ordering};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use tagstore_storage::{RecordKey, RecordStore, WritePolicy};

use crate::accumulator::Accumulator;
use crate::config::{SchemaConfig, TagStoreConfig, COUNT_BIN, SUM_PRICE_BIN};

/// Outcome of one flush cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Buckets merged into the store
    pub merged: usize,
    /// Buckets that failed and were put back for the next cycle
    pub failed: usize,
}

impl FlushReport {
    /// Whether the cycle had nothing to do
    pub fn is_empty(&self) -> bool {
        self.merged == 0 && self.failed == 0
    }
}

/// Background merge task for one accumulator
///
/// # Example
///
/// ```ignore
/// let flusher = Flusher::new(accumulator, store, &TagStoreConfig::default());
/// let handle = flusher.start()?;
///
/// // ... deliver events to the accumulator ...
///
/// flusher.shutdown();
/// handle.join().unwrap();
/// ```
#[derive(Clone)]
pub struct Flusher {
    accumulator: Arc<Accumulator>,
    store: Arc<dyn RecordStore>,
    schema: SchemaConfig,
    policy: WritePolicy,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    thread_name: String,
}

impl Flusher {
    /// Create a flusher for `accumulator`
    pub fn new(
        accumulator: Arc<Accumulator>,
        store: Arc<dyn RecordStore>,
        config: &TagStoreConfig,
    ) -> Self {
        Self {
            accumulator,
            store,
            schema: config.schema.clone(),
            policy: WritePolicy::default().with_ttl(config.aggregate_ttl()),
            interval: config.flush_interval(),
            shutdown: Arc::new(AtomicBool::new(false)),
            thread_name: "tagstore-flush".to_string(),
        }
    }

    /// Name the background thread started by [`start`](Self::start).
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The accumulator this flusher drains
    pub fn accumulator(&self) -> &Arc<Accumulator> {
        &self.accumulator
    }

    /// Run one flush cycle now.
    pub fn flush_once(&self) -> FlushReport {
        let pending = self.accumulator.drain();
        let mut report = FlushReport::default();
        for (bucket_key, counter) in pending {
            let key = RecordKey::new(
                &self.schema.namespace,
                &self.schema.aggregate_set,
                &bucket_key,
            );
            let increments = [(COUNT_BIN, counter.count), (SUM_PRICE_BIN, counter.sum_price)];
            match self.store.add(&self.policy, &key, &increments) {
                Ok(_) => report.merged += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to merge aggregate bucket, keeping it pending");
                    self.accumulator.restore(bucket_key, counter);
                    report.failed += 1;
                }
            }
        }
        if !report.is_empty() {
            debug!(merged = report.merged, failed = report.failed, "flush cycle complete");
        }
        report
    }

    /// Start the periodic flush loop
    ///
    /// Returns a JoinHandle that can be used to wait for the thread to
    /// complete. The thread runs until `shutdown()` is called and flushes
    /// once more before exiting.
    ///
    /// # Errors
    ///
    /// Fails if the OS refuses to spawn the thread.
    pub fn start(&self) -> io::Result<JoinHandle<()>> {
        let flusher = self.clone();
        thread::Builder::new().name(self.thread_name.clone()).spawn(move || {
            loop {
                // Sleep in short slices so shutdown is noticed promptly.
                let slice = Duration::from_millis(50).min(flusher.interval);
                let mut elapsed = Duration::ZERO;
                while elapsed < flusher.interval {
                    if flusher.is_shutdown() {
                        let report = flusher.flush_once();
                        info!(merged = report.merged, failed = report.failed, "final flush on shutdown");
                        return;
                    }
                    thread::sleep(slice);
                    elapsed += slice;
                }
                let report = flusher.flush_once();
                if report.failed > 0 {
                    warn!(failed = report.failed, merged = report.merged, "flush cycle left buckets pending");
                }
            }
        })
    }

    /// Signal shutdown (for graceful termination)
    ///
    /// After calling this, the background thread flushes one last time and
    /// exits.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
