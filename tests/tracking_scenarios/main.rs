//! Cross-crate tracking scenarios
//!
//! End-to-end behaviour of appends, profile queries and aggregation against
//! a shared record store.

#[path = "../common/mod.rs"]
mod common;

mod event_log;
mod service;
