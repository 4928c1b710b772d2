//! Aggregate bucket key derivation
//!
//! Key format: `<minute_bucket>_<ACTION>[_<origin>][_<brand_id>][_<category_id>]`.
//! Segments always appear in that order, so the query side can rebuild the
//! exact key the ingest side wrote from whichever filters were supplied.
//!
//! An absent origin contributes an empty segment, so the origin-only key of
//! such an event is `<bucket>_<ACTION>_` and never collides with the totals
//! key `<bucket>_<ACTION>`.

use tagstore_core::{Action, Event};

/// Number of bucket keys each event is counted under
pub const DIMENSION_COMBINATIONS: usize = 8;

/// Build a bucket key from its segments
pub fn bucket_key(bucket: &str, action: Action, dimensions: &[&str]) -> String {
    let extra: usize = dimensions.iter().map(|d| d.len() + 1).sum();
    let mut key = String::with_capacity(bucket.len() + 5 + extra);
    key.push_str(bucket);
    key.push('_');
    key.push_str(action.as_str());
    for dimension in dimensions {
        key.push('_');
        key.push_str(dimension);
    }
    key
}

/// The eight keys an event is pre-aggregated under.
///
/// Totals, each single dimension, each pair, and the full triple.
pub fn event_bucket_keys(bucket: &str, event: &Event) -> [String; DIMENSION_COMBINATIONS] {
    let origin = event.origin.as_deref().unwrap_or("");
    let brand = event.product.brand_id.as_str();
    let category = event.product.category_id.as_str();
    let action = event.action;
    [
        bucket_key(bucket, action, &[]),
        bucket_key(bucket, action, &[origin]),
        bucket_key(bucket, action, &[brand]),
        bucket_key(bucket, action, &[category]),
        bucket_key(bucket, action, &[origin, brand]),
        bucket_key(bucket, action, &[origin, category]),
        bucket_key(bucket, action, &[brand, category]),
        bucket_key(bucket, action, &[origin, brand, category]),
    ]
}

/// Key for a query, using exactly the filters that were supplied
pub fn query_bucket_key(
    bucket: &str,
    action: Action,
    origin: Option<&str>,
    brand_id: Option<&str>,
    category_id: Option<&str>,
) -> String {
    let dimensions: Vec<&str> = [origin, brand_id, category_id]
        .into_iter()
        .flatten()
        .collect();
    bucket_key(bucket, action, &dimensions)
}
