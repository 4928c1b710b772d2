//! Event log and profile query scenarios
//!
//! - Bounded, most-recent-first sub-logs under any append order
//! - No lost appends when writers race on one visitor
//! - Half-open range and limit semantics of the profile query

use crate::common::*;
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tagstore::{EventLogStore, ProfileQuery, RetryConfig, TimeRange};

fn logs(config: &TagStoreConfig) -> (Arc<MemoryStore>, EventLogStore) {
    let store = Arc::new(MemoryStore::new());
    let logs = EventLogStore::new(store.clone(), config);
    (store, logs)
}

// ============================================================================
// Bound and order
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn sub_log_is_bounded_and_descending(offsets in proptest::collection::vec(0i64..10_000, 0..260)) {
        let (_, logs) = logs(&TagStoreConfig::default());
        for (i, offset) in offsets.iter().enumerate() {
            let e = EventBuilder::new("v", Action::View).at(*offset).product(i as i64).build();
            logs.append_event(&e).unwrap();
        }

        let views = logs.read_profile("v").unwrap().views;
        prop_assert_eq!(views.len(), offsets.len().min(200));
        prop_assert!(views.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        // What survives is exactly the newest slice.
        let mut expected = offsets.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        expected.truncate(200);
        let kept: Vec<i64> = views.iter().map(|e| (e.timestamp - t0()).num_seconds()).collect();
        prop_assert_eq!(kept, expected);
    }
}

#[test]
fn two_hundred_and_one_appends_drop_the_oldest() {
    let (_, logs) = logs(&TagStoreConfig::default());
    for secs in 0..201 {
        logs.append_event(&buy("v", secs)).unwrap();
    }
    let buys = logs.read_profile("v").unwrap().buys;
    assert_eq!(buys.len(), 200);
    assert_eq!(buys.first().unwrap().timestamp, at(200));
    assert_eq!(buys.last().unwrap().timestamp, at(1));
}

#[test]
fn late_arrival_is_placed_by_timestamp() {
    let (_, logs) = logs(&TagStoreConfig::default());
    logs.append_event(&view("v", 30)).unwrap();
    logs.append_event(&view("v", 90)).unwrap();
    logs.append_event(&view("v", 60)).unwrap();

    let times: Vec<_> = logs
        .read_profile("v")
        .unwrap()
        .views
        .iter()
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(times, vec![at(90), at(60), at(30)]);
}

// ============================================================================
// Concurrent appends
// ============================================================================

#[test]
fn concurrent_appends_to_one_visitor_are_all_kept() {
    let (_, logs) = logs(&TagStoreConfig::default());
    let logs = Arc::new(logs);

    let num_threads = 8;
    let appends_per_thread = 10;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let logs = Arc::clone(&logs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..appends_per_thread {
                    let id = (t * appends_per_thread + i) as i64;
                    let e = EventBuilder::new("shared", Action::View).at(id).product(id).build();
                    logs.append_event(&e).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let profile = logs.read_profile("shared").unwrap();
    assert_eq!(profile.views.len(), num_threads * appends_per_thread);
    let mut ids: Vec<i64> = profile.views.iter().map(|e| e.product.product_id).collect();
    ids.sort_unstable();
    let expected: Vec<i64> = (0..(num_threads * appends_per_thread) as i64).collect();
    assert_eq!(ids, expected);
    assert_eq!(profile.generation, Some((num_threads * appends_per_thread) as u32));
}

#[test]
fn two_racing_first_appends_both_land() {
    for _ in 0..20 {
        let (_, logs) = logs(&TagStoreConfig::default());
        let logs = Arc::new(logs);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [view("fresh", 1), buy("fresh", 2)]
            .into_iter()
            .map(|e| {
                let logs = Arc::clone(&logs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    logs.append_event(&e).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let profile = logs.read_profile("fresh").unwrap();
        assert_eq!(profile.views.len(), 1);
        assert_eq!(profile.buys.len(), 1);
    }
}

#[test]
fn capped_retries_still_converge_under_light_contention() {
    let config = TagStoreConfig {
        retry: RetryConfig::new().with_max_retries(1_000),
        ..TagStoreConfig::default()
    };
    let (_, logs) = logs(&config);
    let logs = Arc::new(logs);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logs = Arc::clone(&logs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..5 {
                    logs.append_event(&buy("capped", t * 5 + i)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(logs.read_profile("capped").unwrap().buys.len(), 20);
}

// ============================================================================
// Profile query
// ============================================================================

#[test]
fn view_then_buy_within_a_minute() {
    let (_, logs) = logs(&TagStoreConfig::default());
    logs.append_event(&view("c1", 0)).unwrap();
    logs.append_event(&buy("c1", 30)).unwrap();

    let query = ProfileQuery::new(Arc::new(logs), 200);
    let range = TimeRange::new(at(0), at(60)).unwrap();
    let result = query.query("c1", &range, Some(10)).unwrap();

    assert_eq!(result.cookie, "c1");
    assert_eq!(result.views.len(), 1);
    assert_eq!(result.buys.len(), 1);
    assert_eq!(result.views[0].timestamp, at(0));
    assert_eq!(result.buys[0].timestamp, at(30));
}

#[test]
fn range_start_is_inclusive_and_end_exclusive() {
    let (_, logs) = logs(&TagStoreConfig::default());
    for secs in [0, 59, 60] {
        logs.append_event(&view("c1", secs)).unwrap();
    }
    let query = ProfileQuery::new(Arc::new(logs), 200);
    let result = query
        .query("c1", &TimeRange::new(at(0), at(60)).unwrap(), None)
        .unwrap();
    let times: Vec<_> = result.views.iter().map(|e| e.timestamp).collect();
    assert_eq!(times, vec![at(59), at(0)]);
}

#[test]
fn limit_returns_most_recent_in_range() {
    let (_, logs) = logs(&TagStoreConfig::default());
    for secs in 0..50 {
        logs.append_event(&buy("c1", secs)).unwrap();
    }
    let query = ProfileQuery::new(Arc::new(logs), 200);
    let result = query
        .query("c1", &TimeRange::new(at(10), at(40)).unwrap(), Some(5))
        .unwrap();
    let times: Vec<_> = result.buys.iter().map(|e| e.timestamp).collect();
    assert_eq!(times, vec![at(39), at(38), at(37), at(36), at(35)]);
}

#[test]
fn default_limit_applies_when_none_given() {
    let (_, logs) = logs(&TagStoreConfig::default());
    for secs in 0..12 {
        logs.append_event(&view("c1", secs)).unwrap();
    }
    let query = ProfileQuery::new(Arc::new(logs), 7);
    let result = query
        .query("c1", &TimeRange::new(at(0), at(3600)).unwrap(), None)
        .unwrap();
    assert_eq!(result.views.len(), 7);
}
