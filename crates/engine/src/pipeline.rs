//! Aggregation pipeline: partitioned delivery into accumulators
//!
//! Published events are routed by partition key (the minute bucket) to one
//! of a fixed number of partitions. Each partition owns a bounded channel, a
//! worker thread that records deliveries into its accumulator, and a
//! [`Flusher`] that merges that accumulator into the store.
//!
//! Delivery is at-most-once: a full or closed channel drops the event with
//! a warning and the append path never notices.

use std::hash::{Hash, Hasher};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHasher;
use tracing::{debug, info, warn};

use tagstore_core::{Event, Result};
use tagstore_storage::RecordStore;

use crate::accumulator::Accumulator;
use crate::config::TagStoreConfig;
use crate::flusher::{FlushReport, Flusher};
use crate::publisher::EventPublisher;

struct Delivery {
    bucket: String,
    event: Event,
}

/// Partition a key maps to. Same key, same partition.
pub fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Running set of partition workers and flushers
///
/// Implements [`EventPublisher`], so it can be handed straight to
/// [`EventLogStore::with_publisher`](crate::EventLogStore::with_publisher).
pub struct AggregationPipeline {
    senders: RwLock<Vec<SyncSender<Delivery>>>,
    partitions: usize,
    accumulators: Vec<Arc<Accumulator>>,
    flushers: Vec<Flusher>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    flusher_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AggregationPipeline {
    /// Start `config.partitions` workers and flushers writing to `store`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an invalid config, `IoError` if a worker thread
    /// cannot be spawned.
    pub fn start(store: Arc<dyn RecordStore>, config: &TagStoreConfig) -> Result<Self> {
        config.validate()?;

        let partitions = config.partitions;
        // Built in place so a failed spawn stops whatever already started.
        let mut pipeline = Self {
            senders: RwLock::new(Vec::with_capacity(partitions)),
            partitions,
            accumulators: Vec::with_capacity(partitions),
            flushers: Vec::with_capacity(partitions),
            workers: Mutex::new(Vec::with_capacity(partitions)),
            flusher_handles: Mutex::new(Vec::with_capacity(partitions)),
        };

        for partition in 0..partitions {
            let (tx, rx) = mpsc::sync_channel(config.channel_capacity);
            let accumulator = Arc::new(Accumulator::new());
            let worker_acc = Arc::clone(&accumulator);
            let handle = thread::Builder::new()
                .name(format!("tagstore-agg-{}", partition))
                .spawn(move || worker_loop(partition, rx, &worker_acc))?;
            pipeline.senders.get_mut().push(tx);
            pipeline.workers.get_mut().push(handle);

            let flusher = Flusher::new(Arc::clone(&accumulator), Arc::clone(&store), config)
                .with_thread_name(format!("tagstore-flush-{}", partition));
            pipeline.flusher_handles.get_mut().push(flusher.start()?);
            pipeline.flushers.push(flusher);
            pipeline.accumulators.push(accumulator);
        }

        info!(
            partitions,
            channel_capacity = config.channel_capacity,
            flush_interval_ms = config.flush_interval_ms,
            "aggregation pipeline started"
        );
        Ok(pipeline)
    }

    /// Number of partitions
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Accumulator of one partition
    pub fn accumulator(&self, partition: usize) -> Option<&Arc<Accumulator>> {
        self.accumulators.get(partition)
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.senders.read().is_empty()
    }

    /// Flush every partition now, outside the periodic schedule.
    ///
    /// Deliveries still queued in a channel are not included.
    pub fn flush_now(&self) -> FlushReport {
        self.flushers
            .iter()
            .map(Flusher::flush_once)
            .fold(FlushReport::default(), |acc, r| FlushReport {
                merged: acc.merged + r.merged,
                failed: acc.failed + r.failed,
            })
    }

    /// Stop accepting events, drain every channel, and flush one last time.
    ///
    /// Blocks until all worker and flusher threads have exited. Calling it
    /// again is a no-op.
    pub fn shutdown(&self) {
        // Dropping the senders ends each worker's receive loop once its
        // channel is empty.
        let senders = std::mem::take(&mut *self.senders.write());
        let was_open = !senders.is_empty();
        drop(senders);

        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                warn!("aggregation worker panicked");
            }
        }
        for flusher in &self.flushers {
            flusher.shutdown();
        }
        for handle in self.flusher_handles.lock().drain(..) {
            if handle.join().is_err() {
                warn!("flusher thread panicked");
            }
        }
        if was_open {
            info!(partitions = self.partitions, "aggregation pipeline stopped");
        }
    }
}

impl EventPublisher for AggregationPipeline {
    fn publish(&self, partition_key: &str, event: &Event) {
        let senders = self.senders.read();
        if senders.is_empty() {
            warn!(partition_key, "aggregation pipeline closed, dropping event");
            return;
        }
        let partition = partition_for(partition_key, senders.len());
        let delivery = Delivery {
            bucket: partition_key.to_string(),
            event: event.clone(),
        };
        match senders[partition].try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(partition_key, partition, "aggregation channel full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(partition_key, partition, "aggregation worker gone, dropping event");
            }
        }
    }
}

impl Drop for AggregationPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(partition: usize, rx: Receiver<Delivery>, accumulator: &Accumulator) {
    let mut delivered = 0u64;
    for delivery in rx {
        accumulator.record(&delivery.bucket, &delivery.event);
        delivered += 1;
    }
    debug!(partition, delivered, "aggregation worker exiting");
}
