//! Shared fixtures for the integration tests
//!
//! - a fully wired purchase-style service over the in-memory store
//! - a repository wrapper that delays inserts, to widen allocation races
//! - delivery targets that always fail

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use shopdoc::cache::{CacheError, CacheRepository, CacheResult, TtlCounterCache};
use shopdoc::config::CoreConfig;
use shopdoc::model::{
    new_guid, DeletedActivity, DocumentPayload, IdentityField, KeyRecord, ModuleKind, Pageable,
    Pagination, TransactionPayload, TransactionalDocument,
};
use shopdoc::outbox::{Outbox, OutboxConfig};
use shopdoc::sink::{
    DeliveryError, DeliveryResult, MemoryReplicationSink, MemorySyncNotifier, ReplicationSink,
};
use shopdoc::store::{ActivitySource, DocumentRepository, InMemoryDocumentStore, StoreResult};
use shopdoc::transaction::TransactionService;

pub type Store = InMemoryDocumentStore<TransactionPayload>;
pub type Doc = TransactionalDocument<TransactionPayload>;

// =============================================================================
// Clock and payloads
// =============================================================================

/// 2024-01-02 at `hour`:00 UTC
pub fn jan2(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap()
}

/// Payload dated 2024-01-02, no DocNo yet
pub fn payload() -> TransactionPayload {
    TransactionPayload::new(jan2(10))
}

pub fn stored(shop_id: &str, doc_no: &str) -> Doc {
    TransactionalDocument::new(
        shop_id,
        new_guid(),
        TransactionPayload::new(jan2(8)).with_doc_no(doc_no),
        "seed",
        jan2(8),
    )
}

/// Defaults with deterministic outbox backoff
pub fn config() -> CoreConfig {
    CoreConfig {
        outbox: OutboxConfig {
            jitter: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

// =============================================================================
// Wired service
// =============================================================================

pub struct Harness {
    pub store: Arc<Store>,
    pub cache: Arc<TtlCounterCache>,
    pub sink: Arc<MemoryReplicationSink<TransactionPayload>>,
    pub notifier: Arc<MemorySyncNotifier>,
    pub outbox: Arc<Outbox>,
    pub service: TransactionService<TransactionPayload>,
}

impl Harness {
    pub fn new(module: ModuleKind, config: CoreConfig) -> Self {
        let store = Arc::new(Store::new());
        Self::build(module, config, store.clone(), store)
    }

    /// Inserts wait `delay` before reaching the store
    pub fn with_create_delay(module: ModuleKind, config: CoreConfig, delay: Duration) -> Self {
        let store = Arc::new(Store::new());
        let repo = Arc::new(SlowRepository::new(store.clone(), delay));
        Self::build(module, config, store, repo)
    }

    fn build(
        module: ModuleKind,
        config: CoreConfig,
        store: Arc<Store>,
        repo: Arc<dyn DocumentRepository<TransactionPayload>>,
    ) -> Self {
        let cache = Arc::new(TtlCounterCache::new());
        let sink = Arc::new(MemoryReplicationSink::new());
        let notifier = Arc::new(MemorySyncNotifier::new());
        let outbox = Outbox::start(config.outbox.clone());

        let service = TransactionService::new(
            module,
            repo,
            cache.clone(),
            sink.clone(),
            outbox.clone(),
            config,
        )
        .with_notifier(notifier.clone());

        Self {
            store,
            cache,
            sink,
            notifier,
            outbox,
            service,
        }
    }

    /// Store a document directly, bypassing the service
    pub async fn seed(&self, shop_id: &str, doc_no: &str) -> String {
        self.store
            .create(stored(shop_id, doc_no))
            .await
            .expect("seed document rejected")
    }

    /// Wait for every queued side effect to finish
    pub async fn settle(&self) {
        self.outbox.wait_idle().await;
    }
}

// =============================================================================
// Test doubles
// =============================================================================

/// Delegates to the in-memory store, sleeping before each insert
pub struct SlowRepository<T> {
    inner: Arc<InMemoryDocumentStore<T>>,
    create_delay: Duration,
}

impl<T: DocumentPayload> SlowRepository<T> {
    pub fn new(inner: Arc<InMemoryDocumentStore<T>>, create_delay: Duration) -> Self {
        Self {
            inner,
            create_delay,
        }
    }
}

#[async_trait]
impl<T: DocumentPayload> DocumentRepository<T> for SlowRepository<T> {
    async fn create(&self, doc: TransactionalDocument<T>) -> StoreResult<String> {
        tokio::time::sleep(self.create_delay).await;
        self.inner.create(doc).await
    }

    async fn create_in_batch(&self, docs: Vec<TransactionalDocument<T>>) -> StoreResult<()> {
        self.inner.create_in_batch(docs).await
    }

    async fn update(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        doc: TransactionalDocument<T>,
    ) -> StoreResult<()> {
        self.inner.update(shop_id, guid_fixed, doc).await
    }

    async fn find_by_guid(
        &self,
        shop_id: &str,
        guid_fixed: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        self.inner.find_by_guid(shop_id, guid_fixed).await
    }

    async fn find_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
    ) -> StoreResult<Vec<TransactionalDocument<T>>> {
        self.inner.find_by_guids(shop_id, guids).await
    }

    async fn find_by_doc_identity(
        &self,
        shop_id: &str,
        field: IdentityField,
        value: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        self.inner.find_by_doc_identity(shop_id, field, value).await
    }

    async fn doc_no_taken(&self, shop_id: &str, doc_no: &str) -> StoreResult<bool> {
        self.inner.doc_no_taken(shop_id, doc_no).await
    }

    async fn find_last_doc_no(
        &self,
        shop_id: &str,
        prefix: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        self.inner.find_last_doc_no(shop_id, prefix).await
    }

    async fn find_in_item_guid(
        &self,
        shop_id: &str,
        field: IdentityField,
        keys: &[String],
    ) -> StoreResult<Vec<KeyRecord>> {
        self.inner.find_in_item_guid(shop_id, field, keys).await
    }

    async fn delete_by_guid(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        deleted_by: &str,
    ) -> StoreResult<()> {
        self.inner.delete_by_guid(shop_id, guid_fixed, deleted_by).await
    }

    async fn delete_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
        deleted_by: &str,
    ) -> StoreResult<usize> {
        self.inner.delete_by_guids(shop_id, guids, deleted_by).await
    }
}

#[async_trait]
impl<T: DocumentPayload> ActivitySource<T> for SlowRepository<T> {
    async fn find_created_or_updated_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<TransactionalDocument<T>>, Pagination)> {
        self.inner
            .find_created_or_updated_since(shop_id, since, pageable)
            .await
    }

    async fn find_deleted_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<DeletedActivity>, Pagination)> {
        self.inner.find_deleted_since(shop_id, since, pageable).await
    }
}

/// Broker that is always down
pub struct FailingSink;

#[async_trait]
impl<T: DocumentPayload> ReplicationSink<T> for FailingSink {
    async fn create(&self, _doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        Err(DeliveryError::Unavailable("broker down".into()))
    }

    async fn update(&self, _doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        Err(DeliveryError::Unavailable("broker down".into()))
    }

    async fn delete(&self, _doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        Err(DeliveryError::Unavailable("broker down".into()))
    }

    async fn delete_in_batch(&self, _docs: &[TransactionalDocument<T>]) -> DeliveryResult<()> {
        Err(DeliveryError::Unavailable("broker down".into()))
    }
}

/// Counter cache that is always unreachable
pub struct FailingCache;

#[async_trait]
impl CacheRepository for FailingCache {
    async fn get(&self, _shop_id: &str, _prefix: &str) -> CacheResult<Option<u64>> {
        Err(CacheError::Unavailable("cache offline".into()))
    }

    async fn save(
        &self,
        _shop_id: &str,
        _prefix: &str,
        _value: u64,
        _ttl: Duration,
    ) -> CacheResult<()> {
        Err(CacheError::Unavailable("cache offline".into()))
    }

    async fn save_if_greater(
        &self,
        _shop_id: &str,
        _prefix: &str,
        _value: u64,
        _ttl: Duration,
    ) -> CacheResult<bool> {
        Err(CacheError::Unavailable("cache offline".into()))
    }
}
