//! Incremental-sync activity tests
//!
//! Created-or-updated and deleted feeds are queried together and merged,
//! with the pagination of whichever feed is larger.

mod support;

use chrono::{Duration as ChronoDuration, Utc};

use shopdoc::activity::last_activity;
use shopdoc::model::{ModuleKind, Pageable};

use support::{config, payload, Harness};

// =============================================================================
// Merged Feeds
// =============================================================================

#[tokio::test]
async fn test_changes_and_tombstones_since() {
    let h = Harness::new(ModuleKind::Purchase, config());
    let since = Utc::now() - ChronoDuration::seconds(1);

    let (kept, _) = h.service.create("s1", "alice", payload()).await.unwrap();
    let (edited, _) = h.service.create("s1", "alice", payload()).await.unwrap();
    let (removed, _) = h.service.create("s1", "alice", payload()).await.unwrap();
    h.service
        .update("s1", &edited, "bob", payload().with_description("edited"))
        .await
        .unwrap();
    h.service.delete("s1", &removed, "bob").await.unwrap();

    let (activity, pagination) = h
        .service
        .last_activity("s1", since, Pageable::default())
        .await
        .unwrap();

    let mut new: Vec<_> = activity.new.iter().map(|d| d.guid_fixed.clone()).collect();
    new.sort();
    let mut expected = vec![kept, edited];
    expected.sort();
    assert_eq!(new, expected);

    assert_eq!(activity.remove.len(), 1);
    assert_eq!(activity.remove[0].guid_fixed, removed);
    assert_eq!(activity.remove[0].deleted_by, "bob");
    assert_eq!(pagination.total, 2);
}

#[tokio::test]
async fn test_nothing_since_a_future_point() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.service.create("s1", "alice", payload()).await.unwrap();

    let (activity, pagination) = h
        .service
        .last_activity("s1", Utc::now() + ChronoDuration::hours(1), Pageable::default())
        .await
        .unwrap();

    assert!(activity.new.is_empty());
    assert!(activity.remove.is_empty());
    assert_eq!(pagination.total, 0);
}

// =============================================================================
// Pagination
// =============================================================================

/// More deletions than changes: the deleted feed's pagination wins
#[tokio::test]
async fn test_pagination_follows_the_larger_feed() {
    let h = Harness::new(ModuleKind::StockAdjustment, config());
    let since = Utc::now() - ChronoDuration::seconds(1);

    let mut guids = Vec::new();
    for _ in 0..5 {
        guids.push(h.service.create("s1", "alice", payload()).await.unwrap().0);
    }
    h.service
        .delete_by_guids("s1", "bob", &guids[..4])
        .await
        .unwrap();

    let (activity, pagination) = last_activity(h.store.as_ref(), "s1", since, Pageable::new(1, 2))
        .await
        .unwrap();

    assert_eq!(activity.new.len(), 1);
    assert_eq!(activity.remove.len(), 2);
    assert_eq!(pagination.total, 4);
    assert_eq!(pagination.per_page, 2);
    assert_eq!(pagination.total_page, 2);
}

/// Other shops' activity is invisible
#[tokio::test]
async fn test_activity_is_per_shop() {
    let h = Harness::new(ModuleKind::Purchase, config());
    let since = Utc::now() - ChronoDuration::seconds(1);
    h.service.create("s2", "alice", payload()).await.unwrap();

    let (activity, _) = h
        .service
        .last_activity("s1", since, Pageable::default())
        .await
        .unwrap();
    assert!(activity.new.is_empty());
}
