//! Record store trait definitions.

use std::sync::Arc;

use tagstore_core::Result;

use crate::record::{Bin, Record, RecordKey, WritePolicy};

/// Shared multi-writer key-value store.
///
/// This is the only coordination point between writers: there is no
/// in-process locking above it. Implementations must make every single-key
/// operation atomic.
///
/// # Thread Safety
///
/// Stores must be `Send + Sync`; one handle is shared by every request and
/// every flusher.
///
/// # Errors
///
/// - `KeyExists` when a create-only write finds a live record
/// - `GenerationMismatch` when a generation-guarded write loses the race
/// - `StoreUnavailable` for connectivity or any other store failure
pub trait RecordStore: Send + Sync {
    /// Read a record. Absent and expired records both read as `None`.
    fn get(&self, key: &RecordKey) -> Result<Option<Record>>;

    /// Conditionally write bins, returning the new generation.
    fn put(&self, policy: &WritePolicy, key: &RecordKey, bins: Vec<(String, Bin)>)
        -> Result<u32>;

    /// Atomically add to integer bins in one operation, creating the record
    /// and any missing bin at zero first. Returns the new generation.
    fn add(&self, policy: &WritePolicy, key: &RecordKey, increments: &[(&str, i64)])
        -> Result<u32>;

    /// Remove a record. Returns whether a live record was removed.
    fn delete(&self, key: &RecordKey) -> Result<bool>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        (**self).get(key)
    }

    fn put(
        &self,
        policy: &WritePolicy,
        key: &RecordKey,
        bins: Vec<(String, Bin)>,
    ) -> Result<u32> {
        (**self).put(policy, key, bins)
    }

    fn add(
        &self,
        policy: &WritePolicy,
        key: &RecordKey,
        increments: &[(&str, i64)],
    ) -> Result<u32> {
        (**self).add(policy, key, increments)
    }

    fn delete(&self, key: &RecordKey) -> Result<bool> {
        (**self).delete(key)
    }
}
