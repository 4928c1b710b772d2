//! Engine configuration via `tagstore.toml`
//!
//! Every setting has a default; an absent or empty file yields
//! [`TagStoreConfig::default()`]. Values are validated eagerly on load.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use tagstore_core::{Error, Result};

use crate::retry::RetryConfig;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tagstore.toml";

/// Bin holding the encoded view sub-log
pub const VIEWS_BIN: &str = "views";
/// Bin holding the encoded buy sub-log
pub const BUYS_BIN: &str = "buys";
/// Bin holding an aggregate bucket's event count
pub const COUNT_BIN: &str = "count";
/// Bin holding an aggregate bucket's price sum
pub const SUM_PRICE_BIN: &str = "sum_price";

/// Where records live in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Store namespace shared by both collections
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Set holding one profile record per visitor
    #[serde(default = "default_profile_set")]
    pub profile_set: String,
    /// Set holding one record per aggregate bucket key
    #[serde(default = "default_aggregate_set")]
    pub aggregate_set: String,
}

fn default_namespace() -> String {
    "tags".to_string()
}

fn default_profile_set() -> String {
    "users".to_string()
}

fn default_aggregate_set() -> String {
    "aggregates".to_string()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            profile_set: default_profile_set(),
            aggregate_set: default_aggregate_set(),
        }
    }
}

/// Engine configuration loaded from `tagstore.toml`.
///
/// # Example
///
/// ```toml
/// max_events = 200
/// flush_interval_ms = 10000
///
/// [retry]
/// base_delay_ms = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStoreConfig {
    /// Bound on each per-visitor sub-log
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Profile query limit when the caller gives none
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Period between accumulator flushes
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Expiry of flushed aggregate buckets in seconds (0 = never)
    #[serde(default = "default_aggregate_ttl_secs")]
    pub aggregate_ttl_secs: u64,
    /// Number of aggregation partitions, each with its own accumulator
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Bounded queue length per partition
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Conflict retry policy for appends
    #[serde(default)]
    pub retry: RetryConfig,
    /// Store layout
    #[serde(default)]
    pub schema: SchemaConfig,
}

fn default_max_events() -> usize {
    200
}

fn default_limit() -> usize {
    200
}

fn default_flush_interval_ms() -> u64 {
    10_000
}

fn default_aggregate_ttl_secs() -> u64 {
    86_400
}

fn default_partitions() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    10_000
}

impl Default for TagStoreConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            default_limit: default_limit(),
            flush_interval_ms: default_flush_interval_ms(),
            aggregate_ttl_secs: default_aggregate_ttl_secs(),
            partitions: default_partitions(),
            channel_capacity: default_channel_capacity(),
            retry: RetryConfig::default(),
            schema: SchemaConfig::default(),
        }
    }
}

impl TagStoreConfig {
    /// Flush period as a `Duration`
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Aggregate bucket expiry, `None` when disabled
    pub fn aggregate_ttl(&self) -> Option<Duration> {
        (self.aggregate_ttl_secs > 0).then(|| Duration::from_secs(self.aggregate_ttl_secs))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_events", self.max_events as u64),
            ("default_limit", self.default_limit as u64),
            ("flush_interval_ms", self.flush_interval_ms),
            ("partitions", self.partitions as u64),
            ("channel_capacity", self.channel_capacity as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::invalid_input(format!(
                    "'{}' in {} must be greater than zero",
                    name, CONFIG_FILE_NAME
                )));
            }
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::invalid_input(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tagstore engine configuration

# Maximum events kept per visitor in each of the view and buy logs.
max_events = 200

# Profile query limit used when the caller does not pass one.
default_limit = 200

# How often each partition's accumulator is merged into the store.
flush_interval_ms = 10000

# Expiry of aggregate buckets after their last merge (0 = never expire).
aggregate_ttl_secs = 86400

# Aggregation partitions; each owns one accumulator and one flush timer.
partitions = 4

# Per-partition queue length. Publishes beyond it are dropped and logged.
channel_capacity = 10000

[retry]
# Omit max_retries to retry write conflicts without limit.
# max_retries = 100
base_delay_ms = 1
max_delay_ms = 50

[schema]
namespace = "tags"
profile_set = "users"
aggregate_set = "aggregates"
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TagStoreConfig = toml::from_str(content)
            .map_err(|e| Error::invalid_input(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidInput(msg) => {
                Error::invalid_input(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::SerializationError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
