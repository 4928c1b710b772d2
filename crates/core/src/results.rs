//! Query result shapes
//!
//! These are the values handed back to the request layer. Both derive serde
//! so they can be returned as JSON bodies unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::event::Event;

/// Metric that can be requested from an aggregate query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregate {
    /// Number of events
    Count,
    /// Sum of product prices
    SumPrice,
}

impl Aggregate {
    /// Column name and store bin name of this metric
    pub fn column(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::SumPrice => "sum_price",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Aggregate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "COUNT" => Ok(Aggregate::Count),
            "SUM_PRICE" => Ok(Aggregate::SumPrice),
            other => Err(Error::invalid_input(format!("unknown aggregate '{}'", other))),
        }
    }
}

/// Recent history of one visitor, restricted to a time range
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfileResult {
    /// Visitor identifier
    pub cookie: String,
    /// Matching views, most recent first
    pub views: Vec<Event>,
    /// Matching buys, most recent first
    pub buys: Vec<Event>,
}

/// Tabular aggregate result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregatesQueryResult {
    /// Column headers
    pub columns: Vec<String>,
    /// One row per minute bucket that has data
    pub rows: Vec<Vec<String>>,
}
