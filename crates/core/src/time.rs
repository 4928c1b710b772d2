//! Minute buckets and query time ranges
//!
//! All times are UTC. A minute bucket is a timestamp floored to the minute
//! and rendered as `YYYY-MM-DDTHH:MM:SS` with no zone suffix; it is both the
//! transport partition key and the leading segment of aggregate bucket keys.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};

use crate::error::{Error, Result};

/// Render format of a minute bucket
pub const BUCKET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Width of one aggregate bucket
pub const BUCKET_WIDTH_SECS: i64 = 60;

const RANGE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Floor a timestamp to the start of its minute
pub fn floor_to_minute(ts: &DateTime<Utc>) -> DateTime<Utc> {
    // Zeroing seconds and nanos is always representable.
    ts.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(*ts)
}

/// Minute bucket string for a timestamp
pub fn minute_bucket(ts: &DateTime<Utc>) -> String {
    floor_to_minute(ts).format(BUCKET_FORMAT).to_string()
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, RANGE_INPUT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::invalid_input(format!("invalid instant '{}': {}", raw, e)))
}

/// Half-open UTC interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_input(format!(
                "time range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `start_end`, e.g. `2022-03-22T12:25:00_2022-03-22T12:28:00`.
    ///
    /// Fractional seconds and a trailing `Z` on either side are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let (start, end) = raw.split_once('_').ok_or_else(|| {
            Error::invalid_input(format!("time range '{}' is not of the form start_end", raw))
        })?;
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    /// Whether `ts` falls in `[start, end)`
    #[inline]
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts < self.end
    }

    /// Step through the range in whole-minute increments starting at `start`.
    ///
    /// Each yielded item is the minute bucket the step falls in.
    pub fn minute_buckets(&self) -> MinuteBuckets {
        MinuteBuckets {
            current: self.start,
            end: self.end,
        }
    }
}

/// Iterator over the minute buckets of a [`TimeRange`]
#[derive(Debug, Clone)]
pub struct MinuteBuckets {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Iterator for MinuteBuckets {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.current >= self.end {
            return None;
        }
        let bucket = minute_bucket(&self.current);
        self.current += Duration::seconds(BUCKET_WIDTH_SECS);
        Some(bucket)
    }
}
