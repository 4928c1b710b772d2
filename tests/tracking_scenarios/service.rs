//! TagService end to end
//!
//! Raw request parameters in, result tables out, with the aggregation
//! pipeline running in the background.

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tagstore::{AggregatesQueryResult, TagService, UserProfileResult};

const RANGE_3M: &str = "2022-03-22T12:25:00_2022-03-22T12:28:00";

#[test]
fn profile_and_aggregates_over_one_store() {
    let store = Arc::new(MemoryStore::new());
    let service = TagService::open(store, quiet_config()).unwrap();

    service.append_event(&view("c1", 0)).unwrap();
    service.append_event(&buy("c1", 30)).unwrap();
    service
        .append_event(&EventBuilder::new("c2", Action::Buy).at(95).price(40).build())
        .unwrap();
    service.shutdown();

    let profile = service.query_profile("c1", RANGE_3M, Some(10)).unwrap();
    assert_eq!(profile.views.len(), 1);
    assert_eq!(profile.buys.len(), 1);

    let table = service
        .query_aggregates(RANGE_3M, "BUY", &["COUNT", "SUM_PRICE"], &AggregateFilter::none())
        .unwrap();
    assert_eq!(
        table.rows,
        vec![
            vec!["2022-03-22T12:25:00", "BUY", "1", "100"],
            vec!["2022-03-22T12:26:00", "BUY", "1", "40"],
        ]
    );
}

#[test]
fn many_visitors_in_parallel() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(TagService::open(store, quiet_config()).unwrap());
    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let cookie = format!("visitor-{}", t);
                for secs in 0..20 {
                    service.append_event(&view(&cookie, secs)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    service.shutdown();

    for t in 0..num_threads {
        let profile = service
            .query_profile(&format!("visitor-{}", t), RANGE_3M, None)
            .unwrap();
        assert_eq!(profile.views.len(), 20);
    }
    let table = service
        .query_aggregates(RANGE_3M, "view", &["count"], &AggregateFilter::none().with_origin("o"))
        .unwrap();
    assert_eq!(table.columns, vec!["1m_bucket", "action", "origin", "count"]);
    assert_eq!(
        table.rows,
        vec![vec!["2022-03-22T12:25:00", "VIEW", "o", "120"]]
    );
}

#[test]
fn checked_queries_return_computed_results() {
    let service =
        TagService::without_aggregation(Arc::new(MemoryStore::new()), TagStoreConfig::default())
            .unwrap();
    service.append_event(&view("c1", 0)).unwrap();

    let stale = UserProfileResult {
        cookie: "c1".to_string(),
        ..UserProfileResult::default()
    };
    let profile = service
        .query_profile_checked("c1", RANGE_3M, None, Some(&stale))
        .unwrap();
    assert_eq!(profile.views.len(), 1);

    let stale = AggregatesQueryResult {
        columns: vec!["1m_bucket".to_string()],
        rows: vec![vec!["x".to_string()]],
    };
    let table = service
        .query_aggregates_checked(RANGE_3M, "VIEW", &["COUNT"], &AggregateFilter::none(), Some(&stale))
        .unwrap();
    assert!(table.rows.is_empty());
}

#[test]
fn results_serialize_with_wire_names() {
    let service =
        TagService::without_aggregation(Arc::new(MemoryStore::new()), TagStoreConfig::default())
            .unwrap();
    service.append_event(&view("c1", 0)).unwrap();
    let profile = service.query_profile("c1", RANGE_3M, None).unwrap();

    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["cookie"], "c1");
    assert_eq!(json["views"][0]["cookie"], "c1");
    assert_eq!(json["views"][0]["action"], "VIEW");
    assert_eq!(json["views"][0]["device"], "PC");
    assert_eq!(json["views"][0]["product_info"]["brand_id"], "b");
    assert!(json["buys"].as_array().unwrap().is_empty());
}

#[test]
fn service_opens_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(tagstore::config::CONFIG_FILE_NAME);
    TagStoreConfig::write_default_if_missing(&path).unwrap();

    let mut config = TagStoreConfig::from_file(&path).unwrap();
    assert_eq!(config, TagStoreConfig::default());
    config.max_events = 2;
    config.write_to_file(&path).unwrap();

    let service =
        TagService::without_aggregation(Arc::new(MemoryStore::new()), TagStoreConfig::from_file(&path).unwrap())
            .unwrap();
    for secs in 0..5 {
        service.append_event(&buy("c1", secs)).unwrap();
    }
    let profile = service.query_profile("c1", RANGE_3M, None).unwrap();
    assert_eq!(profile.buys.len(), 2);
}
