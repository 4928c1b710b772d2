//! Tracking engine for tagstore
//!
//! This crate builds the tracking semantics on top of a record store:
//! - EventLogStore: bounded per-visitor view/buy logs with optimistic appends
//! - ProfileQuery: time-range and limit view over a visitor's logs
//! - Accumulator / Flusher: in-memory pre-aggregation merged by atomic add
//! - AggregateQuery: minute-bucket tables over a time range
//! - AggregationPipeline: partitioned in-process delivery into accumulators
//! - TagService: the operations the request layer calls
//!
//! The store is the only shared state between callers; all cross-writer
//! coordination goes through its generation check and atomic add.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod aggregate_query;
pub mod config;
pub mod event_log;
pub mod flusher;
pub mod keys;
pub mod pipeline;
pub mod profile;
pub mod publisher;
pub mod retry;
pub mod service;

pub use accumulator::{Accumulator, Counter};
pub use aggregate_query::{AggregateFilter, AggregateQuery};
pub use config::{SchemaConfig, TagStoreConfig};
pub use event_log::{EventLogStore, VisitorProfile};
pub use flusher::{FlushReport, Flusher};
pub use keys::{event_bucket_keys, query_bucket_key};
pub use pipeline::AggregationPipeline;
pub use profile::ProfileQuery;
pub use publisher::{EventPublisher, NoopPublisher};
pub use retry::RetryConfig;
pub use service::TagService;
