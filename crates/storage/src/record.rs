//! Record keys, bins and write policies
//!
//! A record is a small map of named bins addressed by
//! `<namespace>:<set>:<user_key>`. Every write bumps the record's
//! generation, which is what conditional writers compare against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Address of one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Logical database
    pub namespace: String,
    /// Collection within the namespace
    pub set: String,
    /// Caller key within the set
    pub user_key: String,
}

impl RecordKey {
    /// Build a key from its three parts
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            user_key: user_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.user_key)
    }
}

/// A bin value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bin {
    /// Integer counter or scalar
    Int(i64),
    /// Opaque blob
    Bytes(Vec<u8>),
}

impl Bin {
    /// Integer payload, if this is an integer bin
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Bin::Int(v) => Some(*v),
            Bin::Bytes(_) => None,
        }
    }

    /// Blob payload, if this is a bytes bin
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Bin::Bytes(b) => Some(b),
            Bin::Int(_) => None,
        }
    }
}

/// Snapshot of a record as returned by a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Named bins
    pub bins: BTreeMap<String, Bin>,
    /// Write generation, starting at 1 on creation
    pub generation: u32,
}

impl Record {
    /// Integer bin by name
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.bins.get(name).and_then(Bin::as_int)
    }

    /// Bytes bin by name
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.bins.get(name).and_then(Bin::as_bytes)
    }
}

/// What a write does when the record already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordExists {
    /// Create, or merge the written bins into the existing record
    #[default]
    Update,
    /// Create, or replace every bin of the existing record
    Replace,
    /// Create only; fail with `KeyExists` if the record is present
    CreateOnly,
}

/// Generation precondition of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPolicy {
    /// Write regardless of generation
    #[default]
    None,
    /// Write only if the stored generation equals the given one
    ExpectEqual(u32),
}

/// Per-write options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePolicy {
    /// Existence behavior
    pub exists: RecordExists,
    /// Generation check
    pub generation: GenerationPolicy,
    /// Expiry measured from this write; `None` never expires
    pub ttl: Option<Duration>,
}

impl WritePolicy {
    /// Create-only write for a record read as absent
    pub fn create_only() -> Self {
        Self {
            exists: RecordExists::CreateOnly,
            ..Default::default()
        }
    }

    /// Full replace guarded by the generation that was read
    pub fn replace_if_generation(generation: u32) -> Self {
        Self {
            exists: RecordExists::Replace,
            generation: GenerationPolicy::ExpectEqual(generation),
            ttl: None,
        }
    }

    /// Set the record expiry
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }
}
