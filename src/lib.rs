//! Tagstore - click and purchase tracking backend
//!
//! Tagstore keeps a bounded, most-recent-first history of every visitor's
//! views and buys, and minute-granularity counters of event count and
//! revenue sliced by origin, brand and category.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tagstore::{MemoryStore, TagService, TagStoreConfig};
//!
//! let service = TagService::open(Arc::new(MemoryStore::new()), TagStoreConfig::default())?;
//! service.append_event(&event)?;
//!
//! let profile = service.query_profile("cookie-1", "2022-03-22T12:25:00_2022-03-22T12:28:00", Some(10))?;
//! service.shutdown();
//! ```
//!
//! # Architecture
//!
//! - `tagstore-core`: data model, errors, codec and time helpers
//! - `tagstore-storage`: the record store contract and an in-memory store
//! - `tagstore-engine`: event logs, aggregation and queries

pub use tagstore_core::*;
pub use tagstore_engine::*;
pub use tagstore_storage::*;
