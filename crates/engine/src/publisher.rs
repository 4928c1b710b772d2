//! Fire-and-forget event publishing
//!
//! The append path hands every event to a publisher, keyed by its minute
//! bucket, before touching the event log. Publishing is best-effort:
//! implementations log their own failures and never report back.

use tagstore_core::Event;

/// Best-effort event sink keyed by minute bucket
pub trait EventPublisher: Send + Sync {
    /// Send `event` under `partition_key`. Must not block for long and must
    /// not panic; failures are the publisher's to log.
    fn publish(&self, partition_key: &str, event: &Event);
}

/// Publisher that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _partition_key: &str, _event: &Event) {}
}
