//! DocNo allocation tests
//!
//! Covers:
//! - next number after the last stored DocNo of the day
//! - strictly increasing allocation through the counter cache
//! - collisions fail without persisting anything
//! - concurrent creators racing for the same number

mod support;

use std::sync::Arc;
use std::time::Duration;

use shopdoc::cache::CacheRepository;
use shopdoc::config::CoreConfig;
use shopdoc::docno::{CounterSource, DocNoAllocator, DocNoError};
use shopdoc::model::{DocumentPayload, ModuleKind, TransactionPayload};
use shopdoc::store::DocumentRepository;
use shopdoc::transaction::TransactionError;

use support::{config, payload, stored, FailingCache, Harness, Store};

const PREFIX: &str = "PU20240102";

fn no_retries() -> CoreConfig {
    CoreConfig {
        docno_conflict_retries: 0,
        ..config()
    }
}

// =============================================================================
// Sequence Derivation
// =============================================================================

/// Last stored PU2024010200007 -> next is PU2024010200008, seq 8
#[tokio::test]
async fn test_next_after_last_stored_doc_no() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.seed("s1", "PU2024010200007").await;

    let allocation = h.service.allocator().allocate("s1", PREFIX).await.unwrap();
    assert_eq!(allocation.doc_no, "PU2024010200008");
    assert_eq!(allocation.seq, 8);
    assert_eq!(allocation.source, CounterSource::Storage);

    let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(doc_no, "PU2024010200008");
}

/// Each day starts its own sequence
#[tokio::test]
async fn test_prefixes_are_per_day_and_module() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.seed("s1", "PU2024010100041").await;
    h.seed("s1", "PO2024010200003").await;

    let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(doc_no, "PU2024010200001");
}

/// Numbers of deleted documents are not handed out again
#[tokio::test]
async fn test_tombstoned_numbers_are_not_reissued() {
    let h = Harness::new(ModuleKind::Purchase, config());
    let guid = h.seed("s1", "PU2024010200003").await;
    h.service.delete("s1", &guid, "bob").await.unwrap();

    let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(doc_no, "PU2024010200004");
}

/// Bulk import bypasses the counter cache; a later delete of the imported
/// number must not let the stale counter hand it out again
#[tokio::test(start_paused = true)]
async fn test_imported_then_deleted_number_is_not_reissued() {
    let h = Harness::new(ModuleKind::Purchase, config());
    let (_guid, first) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(first, "PU2024010200001");
    h.settle().await;

    let outcome = h
        .service
        .save_in_batch(
            "s1",
            "importer",
            vec![payload().with_doc_no("PU2024010200002")],
        )
        .await
        .unwrap();
    assert_eq!(outcome.created, vec!["PU2024010200002".to_string()]);

    let imported = h
        .service
        .info_by_doc_no("s1", "PU2024010200002")
        .await
        .unwrap();
    h.service
        .delete("s1", &imported.guid_fixed, "bob")
        .await
        .unwrap();
    h.settle().await;
    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), Some(1));

    let (_guid, next) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(next, "PU2024010200003");
}

/// Cached counter behind a tombstoned number, no retries: collision, nothing written
#[tokio::test]
async fn test_stale_cache_behind_tombstone_collides() {
    let h = Harness::new(ModuleKind::Purchase, no_retries());
    let guid = h.seed("s1", "PU2024010200002").await;
    h.service.delete("s1", &guid, "bob").await.unwrap();
    h.cache
        .save("s1", PREFIX, 1, Duration::from_secs(60))
        .await
        .unwrap();

    let err = h.service.create("s1", "alice", payload()).await.unwrap_err();
    assert_eq!(
        err,
        TransactionError::DocNo(DocNoError::Exists {
            doc_no: "PU2024010200002".into()
        })
    );
    assert_eq!(h.store.snapshot("s1").unwrap().len(), 1);
    assert_eq!(h.store.active_count("s1").unwrap(), 0);
}

#[tokio::test]
async fn test_shops_number_independently() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.seed("s2", "PU2024010200050").await;

    let (_g1, first) = h.service.create("s1", "alice", payload()).await.unwrap();
    let (_g2, second) = h.service.create("s2", "alice", payload()).await.unwrap();
    assert_eq!(first, "PU2024010200001");
    assert_eq!(second, "PU2024010200051");
}

#[tokio::test]
async fn test_configured_width() {
    let h = Harness::new(
        ModuleKind::StockReceiveProduct,
        CoreConfig {
            doc_no_width: 7,
            ..config()
        },
    );
    let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(doc_no, "IF202401020000001");
}

// =============================================================================
// Counter Cache
// =============================================================================

/// Sequential creates yield strictly increasing numbers; the cache catches up
#[tokio::test]
async fn test_allocation_is_strictly_increasing() {
    let h = Harness::new(ModuleKind::Purchase, config());

    let mut issued = Vec::new();
    for _ in 0..5 {
        let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
        issued.push(doc_no);
        h.settle().await;
    }

    assert_eq!(
        issued,
        vec![
            "PU2024010200001",
            "PU2024010200002",
            "PU2024010200003",
            "PU2024010200004",
            "PU2024010200005",
        ]
    );
    assert!(issued.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), Some(5));
    let next = h.service.allocator().allocate("s1", PREFIX).await.unwrap();
    assert_eq!(next.source, CounterSource::Cache);
    assert_eq!(next.seq, 6);
}

/// After the 24h TTL the counter is recomputed from storage
#[tokio::test(start_paused = true)]
async fn test_cached_counter_expires_after_a_day() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.service.create("s1", "alice", payload()).await.unwrap();
    h.settle().await;
    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), Some(1));

    tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;

    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), None);
    let next = h.service.allocator().allocate("s1", PREFIX).await.unwrap();
    assert_eq!(next.source, CounterSource::Storage);
    assert_eq!(next.seq, 2);
}

/// An unreachable cache degrades to storage on read
#[tokio::test]
async fn test_unreachable_cache_falls_back_to_storage() {
    let store = Arc::new(Store::new());
    store.create(stored("s1", "PU2024010200002")).await.unwrap();
    let allocator: DocNoAllocator<TransactionPayload> =
        DocNoAllocator::new("PU", store.clone(), Arc::new(FailingCache));

    let allocation = allocator.allocate("s1", PREFIX).await.unwrap();
    assert_eq!(allocation.seq, 3);
    assert_eq!(allocation.source, CounterSource::Storage);
}

// =============================================================================
// Collisions
// =============================================================================

/// Stale cache points at a taken number: no retries -> error, nothing written
#[tokio::test]
async fn test_collision_fails_without_persisting() {
    let h = Harness::new(ModuleKind::Purchase, no_retries());
    h.seed("s1", "PU2024010200005").await;
    h.cache
        .save("s1", PREFIX, 4, Duration::from_secs(60))
        .await
        .unwrap();

    let err = h.service.create("s1", "alice", payload()).await.unwrap_err();
    assert_eq!(
        err,
        TransactionError::DocNo(DocNoError::Exists {
            doc_no: "PU2024010200005".into()
        })
    );
    assert!(err.to_string().starts_with("DocNo is exists"));

    assert_eq!(h.store.active_count("s1").unwrap(), 1);
    h.settle().await;
    assert!(h.sink.events().is_empty());
    assert!(!h.notifier.is_dirty("s1", "purchase"));
}

/// Same stale cache with retries enabled: reallocated from storage
#[tokio::test(start_paused = true)]
async fn test_collision_retry_takes_next_number() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.seed("s1", "PU2024010200005").await;
    h.cache
        .save("s1", PREFIX, 4, Duration::from_secs(60))
        .await
        .unwrap();

    let (_guid, doc_no) = h.service.create("s1", "alice", payload()).await.unwrap();
    assert_eq!(doc_no, "PU2024010200006");

    h.settle().await;
    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), Some(6));
}

// =============================================================================
// Concurrent Creators
// =============================================================================

/// Both creators see last = 7 on a cold cache and pick 8
#[tokio::test]
async fn test_concurrent_allocations_compute_the_same_candidate() {
    let h = Harness::new(ModuleKind::Purchase, config());
    h.seed("s1", "PU2024010200007").await;
    let allocator = h.service.allocator();

    let (a, b) = tokio::join!(
        allocator.allocate("s1", PREFIX),
        allocator.allocate("s1", PREFIX)
    );
    assert_eq!(a.unwrap().seq, 8);
    assert_eq!(b.unwrap().seq, 8);
}

/// Delayed inserts hold both creators between check and commit: one wins 8,
/// the other surfaces "DocNo is exists"
#[tokio::test(start_paused = true)]
async fn test_race_at_most_one_commit_per_doc_no() {
    let h = Harness::with_create_delay(
        ModuleKind::Purchase,
        no_retries(),
        Duration::from_millis(50),
    );
    h.seed("s1", "PU2024010200007").await;

    let (first, second) = tokio::join!(
        h.service.create("s1", "alice", payload()),
        h.service.create("s1", "bob", payload())
    );

    let results = [first, second];
    let committed: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].1, "PU2024010200008");
    assert_eq!(failed.len(), 1);
    assert_eq!(
        failed[0],
        &TransactionError::DocNo(DocNoError::Exists {
            doc_no: "PU2024010200008".into()
        })
    );

    let with_eight = h
        .store
        .snapshot("s1")
        .unwrap()
        .into_iter()
        .filter(|d| d.body.doc_no() == "PU2024010200008")
        .count();
    assert_eq!(with_eight, 1);
}

/// Same race with retries: the loser moves on to 9
#[tokio::test(start_paused = true)]
async fn test_race_loser_retries_to_next_number() {
    let h = Harness::with_create_delay(ModuleKind::Purchase, config(), Duration::from_millis(50));
    h.seed("s1", "PU2024010200007").await;

    let (first, second) = tokio::join!(
        h.service.create("s1", "alice", payload()),
        h.service.create("s1", "bob", payload())
    );

    let mut numbers = vec![first.unwrap().1, second.unwrap().1];
    numbers.sort();
    assert_eq!(numbers, vec!["PU2024010200008", "PU2024010200009"]);

    h.settle().await;
    assert_eq!(h.cache.get("s1", PREFIX).await.unwrap(), Some(9));
    assert!(h.outbox.dead_letters().is_empty());
}
