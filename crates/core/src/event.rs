//! Event data model
//!
//! An [`Event`] is an immutable fact about one visitor: a page view or a
//! purchase of a product. Field names on the wire follow the tracking
//! service's JSON form (`time`, `cookie`, `product_info`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::time::minute_bucket;

/// Device class the event was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    /// Desktop browser
    Pc,
    /// Phone or tablet
    Mobile,
    /// Smart TV
    Tv,
}

/// What the visitor did
///
/// The action decides which per-visitor sub-log an event is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Product page view
    View,
    /// Purchase
    Buy,
}

impl Action {
    /// All actions, in sub-log order
    pub const ALL: [Action; 2] = [Action::View, Action::Buy];

    /// Upper-case wire name, also used as the action segment of bucket keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "VIEW",
            Action::Buy => "BUY",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VIEW" => Ok(Action::View),
            "BUY" => Ok(Action::Buy),
            other => Err(Error::invalid_input(format!("unknown action '{}'", other))),
        }
    }
}

/// Product the event refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Numeric product identifier
    pub product_id: i64,
    /// Brand identifier
    pub brand_id: String,
    /// Category identifier
    pub category_id: String,
    /// Price in minor currency units
    pub price: u32,
}

/// A single tracked interaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// When the interaction happened
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    /// Visitor identifier owning the log this event lands in
    #[serde(rename = "cookie")]
    pub visitor_id: String,
    /// Country code
    pub country: String,
    /// Device class
    pub device: Device,
    /// View or buy
    pub action: Action,
    /// Free-text traffic origin, if known
    #[serde(default)]
    pub origin: Option<String>,
    /// Product details
    #[serde(rename = "product_info")]
    pub product: ProductInfo,
}

impl Event {
    /// Minute bucket this event is published and aggregated under
    pub fn minute_bucket(&self) -> String {
        minute_bucket(&self.timestamp)
    }

    /// Price widened for counter arithmetic
    pub fn price(&self) -> i64 {
        i64::from(self.product.price)
    }
}
