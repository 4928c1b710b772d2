//! TagService: the operations the HTTP layer calls
//!
//! Owns the wiring between the event log, both query paths and the
//! aggregation pipeline, and parses the raw string parameters the HTTP layer
//! passes through.

use std::sync::Arc;

use tracing::info;

use tagstore_core::{
    Action, Aggregate, AggregatesQueryResult, Event, Result, TimeRange, UserProfileResult,
};
use tagstore_storage::RecordStore;

use crate::aggregate_query::{AggregateFilter, AggregateQuery};
use crate::config::TagStoreConfig;
use crate::event_log::EventLogStore;
use crate::pipeline::AggregationPipeline;
use crate::profile::ProfileQuery;

/// Entry point for appends and queries against one store
///
/// # Example
///
/// ```ignore
/// let service = TagService::open(Arc::new(MemoryStore::new()), TagStoreConfig::default())?;
/// service.append_event(&event)?;
/// let profile = service.query_profile("cookie-1", "2022-03-22T12:25:00_2022-03-22T12:28:00", Some(10))?;
/// service.shutdown();
/// ```
pub struct TagService {
    config: TagStoreConfig,
    logs: Arc<EventLogStore>,
    profiles: ProfileQuery,
    aggregates: AggregateQuery,
    pipeline: Option<Arc<AggregationPipeline>>,
}

impl TagService {
    /// Open a service that aggregates every appended event.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an invalid config, `IoError` if the pipeline
    /// threads cannot be started.
    pub fn open(store: Arc<dyn RecordStore>, config: TagStoreConfig) -> Result<Self> {
        let pipeline = Arc::new(AggregationPipeline::start(Arc::clone(&store), &config)?);
        let logs = EventLogStore::new(Arc::clone(&store), &config).with_publisher(pipeline.clone());
        Ok(Self::assemble(store, config, logs, Some(pipeline)))
    }

    /// Open a service whose appends are not aggregated.
    pub fn without_aggregation(store: Arc<dyn RecordStore>, config: TagStoreConfig) -> Result<Self> {
        config.validate()?;
        let logs = EventLogStore::new(Arc::clone(&store), &config);
        Ok(Self::assemble(store, config, logs, None))
    }

    fn assemble(
        store: Arc<dyn RecordStore>,
        config: TagStoreConfig,
        logs: EventLogStore,
        pipeline: Option<Arc<AggregationPipeline>>,
    ) -> Self {
        let logs = Arc::new(logs);
        let profiles = ProfileQuery::new(Arc::clone(&logs), config.default_limit);
        let aggregates = AggregateQuery::new(store, &config);
        info!(
            max_events = config.max_events,
            aggregation = pipeline.is_some(),
            "tag service opened"
        );
        Self {
            config,
            logs,
            profiles,
            aggregates,
            pipeline,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TagStoreConfig {
        &self.config
    }

    /// The underlying event log
    pub fn event_log(&self) -> &EventLogStore {
        &self.logs
    }

    /// The aggregation pipeline, if running
    pub fn pipeline(&self) -> Option<&AggregationPipeline> {
        self.pipeline.as_deref()
    }

    /// Record one event.
    pub fn append_event(&self, event: &Event) -> Result<()> {
        self.logs.append_event(event)
    }

    /// Profile of `cookie` over `time_range` (`start_end`).
    pub fn query_profile(
        &self,
        cookie: &str,
        time_range: &str,
        limit: Option<usize>,
    ) -> Result<UserProfileResult> {
        self.query_profile_checked(cookie, time_range, limit, None)
    }

    /// [`query_profile`](Self::query_profile) with discrepancy logging
    /// against `expected`.
    pub fn query_profile_checked(
        &self,
        cookie: &str,
        time_range: &str,
        limit: Option<usize>,
        expected: Option<&UserProfileResult>,
    ) -> Result<UserProfileResult> {
        let range = TimeRange::parse(time_range)?;
        self.profiles.query_checked(cookie, &range, limit, expected)
    }

    /// Aggregate table over `time_range` for `action`, with metric names
    /// such as `COUNT` or `SUM_PRICE`.
    pub fn query_aggregates(
        &self,
        time_range: &str,
        action: &str,
        aggregates: &[&str],
        filter: &AggregateFilter,
    ) -> Result<AggregatesQueryResult> {
        self.query_aggregates_checked(time_range, action, aggregates, filter, None)
    }

    /// [`query_aggregates`](Self::query_aggregates) with discrepancy logging
    /// against `expected`.
    pub fn query_aggregates_checked(
        &self,
        time_range: &str,
        action: &str,
        aggregates: &[&str],
        filter: &AggregateFilter,
        expected: Option<&AggregatesQueryResult>,
    ) -> Result<AggregatesQueryResult> {
        let range = TimeRange::parse(time_range)?;
        let action: Action = action.parse()?;
        let aggregates = aggregates
            .iter()
            .map(|a| a.parse::<Aggregate>())
            .collect::<Result<Vec<_>>>()?;
        self.aggregates
            .query_checked(&range, action, &aggregates, filter, expected)
    }

    /// Stop the pipeline, flushing whatever is still pending.
    pub fn shutdown(&self) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.shutdown();
        }
    }
}

impl Drop for TagService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
