//! Aggregate query: rebuild a table from merged minute buckets
//!
//! Walks the requested range one minute at a time, reads the single bucket
//! record that matches the supplied filters, and emits one row per bucket
//! that exists. Minutes without a record are left out entirely rather than
//! reported as zero, so "no activity" and "not flushed yet" look the same.

use std::sync::Arc;

use tracing::{debug, warn};

use tagstore_core::{Action, Aggregate, AggregatesQueryResult, Result, TimeRange};
use tagstore_storage::{RecordKey, RecordStore};

use crate::config::{SchemaConfig, TagStoreConfig};
use crate::keys::query_bucket_key;

/// Optional dimension filters of an aggregate query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    /// Restrict to one origin
    pub origin: Option<String>,
    /// Restrict to one brand
    pub brand_id: Option<String>,
    /// Restrict to one category
    pub category_id: Option<String>,
}

impl AggregateFilter {
    /// No filters: totals only
    pub fn none() -> Self {
        Self::default()
    }

    /// Filter by origin
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Filter by brand
    pub fn with_brand(mut self, brand_id: impl Into<String>) -> Self {
        self.brand_id = Some(brand_id.into());
        self
    }

    /// Filter by category
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Supplied filters as `(column, value)`, in column order
    fn supplied(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("origin", self.origin.as_deref()),
            ("brand_id", self.brand_id.as_deref()),
            ("category_id", self.category_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
    }
}

/// Read side of the aggregate buckets
#[derive(Clone)]
pub struct AggregateQuery {
    store: Arc<dyn RecordStore>,
    schema: SchemaConfig,
}

impl AggregateQuery {
    /// Query buckets stored in `store`
    pub fn new(store: Arc<dyn RecordStore>, config: &TagStoreConfig) -> Self {
        Self {
            store,
            schema: config.schema.clone(),
        }
    }

    /// Build the result table for `action` over `range`.
    ///
    /// Columns: `1m_bucket`, `action`, each supplied filter, then each
    /// requested metric. A metric missing from an existing bucket reads 0.
    ///
    /// # Errors
    ///
    /// Any store read error fails the whole query.
    pub fn query(
        &self,
        range: &TimeRange,
        action: Action,
        aggregates: &[Aggregate],
        filter: &AggregateFilter,
    ) -> Result<AggregatesQueryResult> {
        let mut columns = vec!["1m_bucket".to_string(), "action".to_string()];
        columns.extend(filter.supplied().map(|(column, _)| column.to_string()));
        columns.extend(aggregates.iter().map(|a| a.column().to_string()));

        let mut rows = Vec::new();
        for bucket in range.minute_buckets() {
            let bucket_key = query_bucket_key(
                &bucket,
                action,
                filter.origin.as_deref(),
                filter.brand_id.as_deref(),
                filter.category_id.as_deref(),
            );
            let key = RecordKey::new(&self.schema.namespace, &self.schema.aggregate_set, bucket_key);
            let Some(record) = self.store.get(&key)? else {
                debug!(key = %key, "no aggregate bucket");
                continue;
            };

            let mut row = Vec::with_capacity(columns.len());
            row.push(bucket);
            row.push(action.as_str().to_string());
            row.extend(filter.supplied().map(|(_, value)| value.to_string()));
            row.extend(
                aggregates
                    .iter()
                    .map(|a| record.get_int(a.column()).unwrap_or(0).to_string()),
            );
            rows.push(row);
        }

        Ok(AggregatesQueryResult { columns, rows })
    }

    /// [`query`](Self::query), logging any difference from a caller-supplied
    /// expected result. The computed result is returned either way.
    pub fn query_checked(
        &self,
        range: &TimeRange,
        action: Action,
        aggregates: &[Aggregate],
        filter: &AggregateFilter,
        expected: Option<&AggregatesQueryResult>,
    ) -> Result<AggregatesQueryResult> {
        let result = self.query(range, action, aggregates, filter)?;
        if let Some(expected) = expected {
            if *expected != result {
                warn!(
                    start = %range.start,
                    end = %range.end,
                    %action,
                    ?filter,
                    expected_rows = expected.rows.len(),
                    actual_rows = result.rows.len(),
                    "aggregate result differs from expected"
                );
                debug!(?expected, actual = ?result, "aggregate discrepancy detail");
            }
        }
        Ok(result)
    }
}
