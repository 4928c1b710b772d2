//! EventLogStore: bounded per-visitor event history
//!
//! ## Design Principles
//!
//! 1. **One record per visitor**: the record holds two encoded sub-logs,
//!    `views` and `buys`. An event lands in exactly one of them, chosen by
//!    its action.
//! 2. **Bounded and sorted**: each sub-log keeps at most `max_events`
//!    entries in descending timestamp order; the oldest fall off.
//! 3. **Optimistic concurrency**: appends read the record and its
//!    generation, rebuild it locally, then write conditionally. A visitor
//!    seen for the first time is written create-only; an existing one is
//!    written only if its generation is unchanged. Losing either race means
//!    re-reading and trying again.
//!
//! ## Failure handling
//!
//! - Conflicts are retried (without limit by default) and never surfaced.
//! - A stored sub-log that fails to decode is logged and treated as empty.
//! - Any other store error aborts the append and is returned.
//!
//! ## Key Design
//!
//! - Record key: `<namespace>:<profile_set>:<visitor_id>`
//! - Bins: `views`, `buys` (compressed encoded event lists)

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use tagstore_core::{Action, Error, Event, EventCodec, Result};
use tagstore_storage::{Bin, Record, RecordKey, RecordStore, WritePolicy};

use crate::config::{SchemaConfig, TagStoreConfig, BUYS_BIN, VIEWS_BIN};
use crate::publisher::{EventPublisher, NoopPublisher};
use crate::retry::RetryConfig;

/// Both sub-logs of one visitor as currently stored
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisitorProfile {
    /// Views, most recent first
    pub views: Vec<Event>,
    /// Buys, most recent first
    pub buys: Vec<Event>,
    /// Record generation; `None` if the visitor has no record yet
    pub generation: Option<u32>,
}

impl VisitorProfile {
    /// Sub-log an action belongs to
    pub fn log(&self, action: Action) -> &[Event] {
        match action {
            Action::View => &self.views,
            Action::Buy => &self.buys,
        }
    }

    fn log_mut(&mut self, action: Action) -> &mut Vec<Event> {
        match action {
            Action::View => &mut self.views,
            Action::Buy => &mut self.buys,
        }
    }
}

/// Insert `event`, restore descending time order, and drop the oldest
/// entries beyond `max_events`.
pub(crate) fn insert_bounded(log: &mut Vec<Event>, event: Event, max_events: usize) {
    log.push(event);
    // Stable: among equal timestamps earlier arrivals keep their place.
    log.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    log.truncate(max_events);
}

/// Per-visitor bounded event log with optimistic-concurrency appends
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tagstore_engine::{EventLogStore, TagStoreConfig};
/// use tagstore_storage::MemoryStore;
///
/// let logs = EventLogStore::new(Arc::new(MemoryStore::new()), &TagStoreConfig::default());
/// logs.append_event(&event)?;
/// let profile = logs.read_profile("cookie-1")?;
/// ```
#[derive(Clone)]
pub struct EventLogStore {
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn EventPublisher>,
    codec: EventCodec,
    schema: SchemaConfig,
    max_events: usize,
    retry: RetryConfig,
}

impl EventLogStore {
    /// Create an event log store that publishes nowhere
    pub fn new(store: Arc<dyn RecordStore>, config: &TagStoreConfig) -> Self {
        Self {
            store,
            publisher: Arc::new(NoopPublisher),
            codec: EventCodec::default(),
            schema: config.schema.clone(),
            max_events: config.max_events,
            retry: config.retry,
        }
    }

    /// Publish every appended event through `publisher`
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Bound on each sub-log
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    fn key_for(&self, visitor_id: &str) -> RecordKey {
        RecordKey::new(&self.schema.namespace, &self.schema.profile_set, visitor_id)
    }

    fn decode_log(&self, record: &Record, bin: &str, key: &RecordKey) -> Vec<Event> {
        match self.codec.decode(record.get_bytes(bin)) {
            Ok(events) => events,
            Err(e) => {
                warn!(key = %key, bin, error = %e, "discarding undecodable sub-log");
                Vec::new()
            }
        }
    }

    fn profile_from(&self, record: Option<&Record>, key: &RecordKey) -> VisitorProfile {
        match record {
            None => VisitorProfile::default(),
            Some(record) => VisitorProfile {
                views: self.decode_log(record, VIEWS_BIN, key),
                buys: self.decode_log(record, BUYS_BIN, key),
                generation: Some(record.generation),
            },
        }
    }

    /// Read both sub-logs of a visitor. An unknown visitor yields empty logs.
    pub fn read_profile(&self, visitor_id: &str) -> Result<VisitorProfile> {
        let key = self.key_for(visitor_id);
        let record = self.store.get(&key)?;
        Ok(self.profile_from(record.as_ref(), &key))
    }

    /// Append one event to its visitor's log.
    ///
    /// The event is published first; the publish outcome never affects the
    /// append. Returns once the conditional write succeeds.
    ///
    /// # Errors
    ///
    /// - `StoreUnavailable` (or any non-conflict store error) on read or write
    /// - `SerializationError` if the sub-logs cannot be encoded
    /// - `RetriesExhausted` only when a retry cap is configured
    pub fn append_event(&self, event: &Event) -> Result<()> {
        self.publisher.publish(&event.minute_bucket(), event);

        let key = self.key_for(&event.visitor_id);
        let mut retries = 0usize;
        loop {
            // Fresh read every attempt; nothing survives a lost race.
            let record = self.store.get(&key)?;
            let policy = match &record {
                None => WritePolicy::create_only(),
                Some(r) => WritePolicy::replace_if_generation(r.generation),
            };
            let mut profile = self.profile_from(record.as_ref(), &key);
            insert_bounded(
                profile.log_mut(event.action),
                event.clone(),
                self.max_events,
            );

            let bins = vec![
                (VIEWS_BIN.to_string(), Bin::Bytes(self.codec.encode(&profile.views)?)),
                (BUYS_BIN.to_string(), Bin::Bytes(self.codec.encode(&profile.buys)?)),
            ];

            match self.store.put(&policy, &key, bins) {
                Ok(generation) => {
                    debug!(key = %key, generation, retries, "appended event");
                    return Ok(());
                }
                Err(e) if e.is_conflict() => {
                    if !self.retry.allows(retries) {
                        return Err(Error::RetriesExhausted {
                            attempts: retries + 1,
                        });
                    }
                    warn!(key = %key, retries, error = %e, "optimistic concurrency conflict, retrying");
                    let delay = self.retry.calculate_delay(retries);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
