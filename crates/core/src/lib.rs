//! Core types for tagstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Event: a tracked view or purchase, with its product
//! - Action / Device: closed enums of the data model
//! - TimeRange: half-open UTC query interval and minute-bucket stepping
//! - EventCodec: compact compressed encoding of a sub-log
//! - Query result shapes returned to the request layer
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod event;
pub mod results;
pub mod time;

pub use codec::EventCodec;
pub use error::{Error, Result};
pub use event::{Action, Device, Event, ProductInfo};
pub use results::{Aggregate, AggregatesQueryResult, UserProfileResult};
pub use time::{floor_to_minute, minute_bucket, TimeRange};
