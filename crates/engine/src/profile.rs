//! Profile query over a visitor's stored logs

use std::sync::Arc;

use tracing::{debug, warn};

use tagstore_core::{Error, Event, Result, TimeRange, UserProfileResult};

use crate::event_log::EventLogStore;

/// Keep the first `limit` events inside `range`.
///
/// `events` must already be in descending time order, which makes the
/// result the `limit` most recent matches.
pub fn filter_recent(events: &[Event], range: &TimeRange, limit: usize) -> Vec<Event> {
    events
        .iter()
        .filter(|e| range.contains(&e.timestamp))
        .take(limit)
        .cloned()
        .collect()
}

/// Time-range and limit view over [`EventLogStore`]
#[derive(Clone)]
pub struct ProfileQuery {
    logs: Arc<EventLogStore>,
    default_limit: usize,
}

impl ProfileQuery {
    /// Query profiles stored in `logs`
    pub fn new(logs: Arc<EventLogStore>, default_limit: usize) -> Self {
        Self {
            logs,
            default_limit,
        }
    }

    /// Views and buys of `cookie` in `[range.start, range.end)`, at most
    /// `limit` of each (default when `None`), most recent first.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a zero limit; store errors propagate.
    pub fn query(
        &self,
        cookie: &str,
        range: &TimeRange,
        limit: Option<usize>,
    ) -> Result<UserProfileResult> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(Error::invalid_input("limit must be a positive integer"));
        }
        let profile = self.logs.read_profile(cookie)?;
        Ok(UserProfileResult {
            cookie: cookie.to_string(),
            views: filter_recent(&profile.views, range, limit),
            buys: filter_recent(&profile.buys, range, limit),
        })
    }

    /// [`query`](Self::query), logging any difference from a caller-supplied
    /// expected result. The computed result is returned either way.
    pub fn query_checked(
        &self,
        cookie: &str,
        range: &TimeRange,
        limit: Option<usize>,
        expected: Option<&UserProfileResult>,
    ) -> Result<UserProfileResult> {
        let result = self.query(cookie, range, limit)?;
        if let Some(expected) = expected {
            if *expected != result {
                warn!(
                    cookie,
                    start = %range.start,
                    end = %range.end,
                    expected_views = expected.views.len(),
                    actual_views = result.views.len(),
                    expected_buys = expected.buys.len(),
                    actual_buys = result.buys.len(),
                    "profile result differs from expected"
                );
                debug!(?expected, actual = ?result, "profile discrepancy detail");
            }
        }
        Ok(result)
    }
}
