//! In-memory sharded record store
//!
//! Records live in a `DashMap`, so every single-key operation runs under the
//! owning shard's write lock and is atomic with respect to every other
//! operation on the same key. Different keys in different shards never
//! contend.
//!
//! # Expiry
//!
//! Expiry is logical: an expired record reads as absent and is overwritten
//! as if absent. `purge_expired()` reclaims the memory.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use tagstore_core::{Error, Result};

use crate::record::{Bin, GenerationPolicy, Record, RecordExists, RecordKey, WritePolicy};
use crate::traits::RecordStore;

/// A record plus its storage-only metadata
#[derive(Debug, Clone)]
struct StoredRecord {
    bins: BTreeMap<String, Bin>,
    generation: u32,
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }

    fn to_record(&self) -> Record {
        Record {
            bins: self.bins.clone(),
            generation: self.generation,
        }
    }
}

fn expiry(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| now.checked_add(ttl))
}

fn check_generation(policy: &WritePolicy, actual: u32) -> Result<()> {
    match policy.generation {
        GenerationPolicy::ExpectEqual(expected) if expected != actual => {
            Err(Error::GenerationMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Sharded in-memory [`RecordStore`]
///
/// # Example
///
/// ```ignore
/// use tagstore_storage::{MemoryStore, RecordKey, RecordStore, WritePolicy, Bin};
///
/// let store = MemoryStore::new();
/// let key = RecordKey::new("tags", "users", "cookie-1");
/// let gen = store.put(&WritePolicy::create_only(), &key, vec![("views".into(), Bin::Bytes(blob))])?;
/// store.put(&WritePolicy::replace_if_generation(gen), &key, bins)?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, StoredRecord>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.records.iter().filter(|r| !r.is_expired(now)).count()
    }

    /// Whether the store holds no live records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired record, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, r| !r.is_expired(now));
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, "purged expired records");
        }
        removed
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        let now = Instant::now();
        Ok(self
            .records
            .get(key)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.to_record()))
    }

    fn put(
        &self,
        policy: &WritePolicy,
        key: &RecordKey,
        bins: Vec<(String, Bin)>,
    ) -> Result<u32> {
        let now = Instant::now();
        match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired(now) => {
                if policy.exists == RecordExists::CreateOnly {
                    return Err(Error::KeyExists(key.to_string()));
                }
                let current = occupied.get_mut();
                check_generation(policy, current.generation)?;
                if policy.exists == RecordExists::Replace {
                    current.bins.clear();
                }
                current.bins.extend(bins);
                current.generation = current.generation.wrapping_add(1);
                current.expires_at = expiry(now, policy.ttl);
                Ok(current.generation)
            }
            entry => {
                // Absent or expired: only a generation guard can refuse.
                check_generation(policy, 0)?;
                let record = StoredRecord {
                    bins: bins.into_iter().collect(),
                    generation: 1,
                    expires_at: expiry(now, policy.ttl),
                };
                match entry {
                    Entry::Occupied(mut occupied) => {
                        occupied.insert(record);
                    }
                    Entry::Vacant(vacant) => {
                        vacant.insert(record);
                    }
                }
                Ok(1)
            }
        }
    }

    fn add(
        &self,
        policy: &WritePolicy,
        key: &RecordKey,
        increments: &[(&str, i64)],
    ) -> Result<u32> {
        let now = Instant::now();
        let mut slot = match self.records.entry(key.clone()) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                check_generation(policy, 0)?;
                vacant.insert(StoredRecord {
                    bins: BTreeMap::new(),
                    generation: 0,
                    expires_at: None,
                })
            }
        };
        let record = slot.value_mut();
        if record.is_expired(now) {
            record.bins.clear();
            record.generation = 0;
        }
        check_generation(policy, record.generation)?;

        // Validate before mutating so a bad bin leaves the record untouched.
        for (name, _) in increments {
            if let Some(Bin::Bytes(_)) = record.bins.get(*name) {
                return Err(Error::invalid_input(format!(
                    "bin '{}' of {} is not an integer",
                    name, key
                )));
            }
        }
        for (name, delta) in increments {
            let bin = record
                .bins
                .entry((*name).to_string())
                .or_insert(Bin::Int(0));
            if let Bin::Int(value) = bin {
                *value = value.saturating_add(*delta);
            }
        }
        record.generation = record.generation.wrapping_add(1);
        record.expires_at = expiry(now, policy.ttl);
        Ok(record.generation)
    }

    fn delete(&self, key: &RecordKey) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .records
            .remove(key)
            .map_or(false, |(_, r)| !r.is_expired(now)))
    }
}
