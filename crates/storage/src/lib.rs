//! Storage layer for tagstore
//!
//! This crate defines the shared record store both tagstore stores sit on:
//! - RecordStore: get / conditional put / atomic add / delete
//! - WritePolicy: create-only and generation-guarded writes, expiry
//! - MemoryStore: DashMap-sharded in-memory implementation
//!
//! All cross-writer coordination goes through the store: generation
//! compare-and-swap for the event logs, atomic multi-bin add for aggregate
//! buckets.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod record;
pub mod traits;

pub use memory::MemoryStore;
pub use record::{Bin, GenerationPolicy, Record, RecordExists, RecordKey, WritePolicy};
pub use traits::RecordStore;
