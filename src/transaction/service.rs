//! Commit coordinator

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::activity;
use crate::cache::CacheRepository;
use crate::config::CoreConfig;
use crate::docno::{Allocation, DocNoAllocator, DocNoError};
use crate::import::import_batch;
use crate::model::{
    new_guid, BulkImport, DocumentPayload, IdentityField, LastActivity, ModuleKind, Pageable,
    Pagination, TransactionalDocument,
};
use crate::outbox::{CounterRefreshJob, DirtyModuleJob, Outbox, ReplicateJob};
use crate::sink::{ReplicationEvent, ReplicationSink, SyncNotifier};
use crate::store::DocumentRepository;

use super::batch::DocNoImportTarget;
use super::errors::{TransactionError, TransactionResult};
use super::DetailEnricher;

/// Largest doubling exponent for the conflict backoff
const MAX_CONFLICT_SHIFT: u32 = 10;

/// Create / update / delete coordinator for one transactional module.
///
/// The primary path (allocation and persistence) runs within
/// `context_timeout` and is the only thing the caller waits for. Side
/// effects are queued on the outbox after the write commits; their outcome
/// never changes the caller's result.
pub struct TransactionService<T> {
    module: ModuleKind,
    repo: Arc<dyn DocumentRepository<T>>,
    cache: Arc<dyn CacheRepository>,
    allocator: DocNoAllocator<T>,
    sink: Arc<dyn ReplicationSink<T>>,
    notifier: Option<Arc<dyn SyncNotifier>>,
    enricher: Option<Arc<dyn DetailEnricher<T>>>,
    outbox: Arc<Outbox>,
    config: CoreConfig,
}

impl<T: DocumentPayload> TransactionService<T> {
    pub fn new(
        module: ModuleKind,
        repo: Arc<dyn DocumentRepository<T>>,
        cache: Arc<dyn CacheRepository>,
        sink: Arc<dyn ReplicationSink<T>>,
        outbox: Arc<Outbox>,
        config: CoreConfig,
    ) -> Self {
        let allocator = DocNoAllocator::new(module.code(), repo.clone(), cache.clone())
            .with_width(config.doc_no_width);

        Self {
            module,
            repo,
            cache,
            allocator,
            sink,
            notifier: None,
            enricher: None,
            outbox,
            config,
        }
    }

    /// Mark the module dirty for full sync after every write
    pub fn with_notifier(mut self, notifier: Arc<dyn SyncNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn DetailEnricher<T>>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn module(&self) -> ModuleKind {
        self.module
    }

    /// Name reported to the sync notifier
    pub fn module_name(&self) -> &'static str {
        self.module.name()
    }

    pub fn allocator(&self) -> &DocNoAllocator<T> {
        &self.allocator
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub(super) fn repository(&self) -> &dyn DocumentRepository<T> {
        self.repo.as_ref()
    }

    /// Allocate a DocNo and persist a new document.
    ///
    /// Returns `(guid_fixed, doc_no)`. A DocNo collision, whether caught by
    /// the allocator or by the storage insert, is retried against storage up
    /// to `docno_conflict_retries` times.
    pub async fn create(
        &self,
        shop_id: &str,
        auth_user: &str,
        doc: T,
    ) -> TransactionResult<(String, String)> {
        require_shop(shop_id)?;
        self.bounded(self.create_inner(shop_id, auth_user, doc)).await
    }

    async fn create_inner(
        &self,
        shop_id: &str,
        auth_user: &str,
        doc: T,
    ) -> TransactionResult<(String, String)> {
        let prefix = self.allocator.prefix(doc.doc_datetime());
        let body = self.enrich(shop_id, doc).await?;

        let mut attempt: u32 = 0;
        loop {
            match self
                .try_create(shop_id, auth_user, &prefix, body.clone(), attempt == 0)
                .await
            {
                Ok((record, allocation)) => {
                    let result = (record.guid_fixed.clone(), allocation.doc_no.clone());
                    info!(
                        module = self.module_name(),
                        shop_id,
                        doc_no = %allocation.doc_no,
                        guid_fixed = %record.guid_fixed,
                        "document created"
                    );
                    self.after_create(record, allocation);
                    return Ok(result);
                }
                Err(e) if e.is_conflict() && attempt < self.config.docno_conflict_retries => {
                    attempt += 1;
                    let pause = conflict_pause(self.config.conflict_backoff(), attempt);
                    warn!(
                        module = self.module_name(),
                        shop_id,
                        prefix = %prefix,
                        attempt,
                        error = %e,
                        "DocNo collision, reallocating from storage"
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_create(
        &self,
        shop_id: &str,
        auth_user: &str,
        prefix: &str,
        mut body: T,
        use_cache: bool,
    ) -> TransactionResult<(TransactionalDocument<T>, Allocation)> {
        let allocation = if use_cache {
            self.allocator.allocate(shop_id, prefix).await?
        } else {
            self.allocator.allocate_from_storage(shop_id, prefix).await?
        };

        body.set_doc_no(allocation.doc_no.clone());
        let record = TransactionalDocument::new(shop_id, new_guid(), body, auth_user, Utc::now());

        match self.repo.create(record.clone()).await {
            Ok(_) => Ok((record, allocation)),
            Err(e) if e.is_conflict() => Err(DocNoError::Exists {
                doc_no: allocation.doc_no,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn after_create(&self, record: TransactionalDocument<T>, allocation: Allocation) {
        let shop_id = record.shop_id.clone();
        self.replicate(ReplicationEvent::Created(record));
        self.outbox.enqueue(Arc::new(CounterRefreshJob::new(
            self.cache.clone(),
            shop_id.clone(),
            allocation.prefix,
            allocation.seq,
            self.config.doc_no_cache_ttl(),
        )));
        self.mark_dirty(&shop_id);
    }

    /// Replace the payload of an active document, keeping its DocNo
    pub async fn update(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        auth_user: &str,
        doc: T,
    ) -> TransactionResult<()> {
        require_shop(shop_id)?;
        self.bounded(async {
            let mut found = self
                .repo
                .find_by_guid(shop_id, guid_fixed)
                .await?
                .ok_or(TransactionError::NotFound)?;

            let body = self.enrich(shop_id, doc).await?;
            found.apply_update(body, auth_user, Utc::now());
            self.repo.update(shop_id, guid_fixed, found.clone()).await?;

            info!(
                module = self.module_name(),
                shop_id,
                guid_fixed,
                doc_no = found.doc_no(),
                "document updated"
            );
            self.replicate(ReplicationEvent::Updated(found));
            self.mark_dirty(shop_id);
            Ok(())
        })
        .await
    }

    /// Tombstone one active document
    pub async fn delete(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        auth_user: &str,
    ) -> TransactionResult<()> {
        require_shop(shop_id)?;
        self.bounded(async {
            let mut found = self
                .repo
                .find_by_guid(shop_id, guid_fixed)
                .await?
                .ok_or(TransactionError::NotFound)?;

            self.repo
                .delete_by_guid(shop_id, guid_fixed, auth_user)
                .await?;
            found.mark_deleted(auth_user, Utc::now());

            info!(module = self.module_name(), shop_id, guid_fixed, "document deleted");
            self.replicate(ReplicationEvent::Deleted(found));
            self.mark_dirty(shop_id);
            Ok(())
        })
        .await
    }

    /// Tombstone every listed active document; returns how many were deleted.
    ///
    /// The replication payload is re-read after the delete so it carries the
    /// tombstones. A failing re-read is logged; the delete stands.
    pub async fn delete_by_guids(
        &self,
        shop_id: &str,
        auth_user: &str,
        guids: &[String],
    ) -> TransactionResult<usize> {
        require_shop(shop_id)?;
        self.bounded(async {
            let deleted = self
                .repo
                .delete_by_guids(shop_id, guids, auth_user)
                .await?;

            match self.repo.find_by_guids(shop_id, guids).await {
                Ok(docs) => {
                    let docs: Vec<_> = docs.into_iter().filter(|d| !d.is_active()).collect();
                    if !docs.is_empty() {
                        self.replicate(ReplicationEvent::DeletedBatch(docs));
                    }
                }
                Err(e) => {
                    error!(
                        module = self.module_name(),
                        shop_id,
                        error = %e,
                        "re-read after batch delete failed, replication skipped"
                    );
                }
            }

            info!(
                module = self.module_name(),
                shop_id,
                requested = guids.len(),
                deleted,
                "documents deleted"
            );
            self.mark_dirty(shop_id);
            Ok(deleted)
        })
        .await
    }

    /// Active document by GuidFixed
    pub async fn info(
        &self,
        shop_id: &str,
        guid_fixed: &str,
    ) -> TransactionResult<TransactionalDocument<T>> {
        self.bounded(async {
            self.repo
                .find_by_guid(shop_id, guid_fixed)
                .await?
                .ok_or(TransactionError::NotFound)
        })
        .await
    }

    /// Active document by DocNo
    pub async fn info_by_doc_no(
        &self,
        shop_id: &str,
        doc_no: &str,
    ) -> TransactionResult<TransactionalDocument<T>> {
        self.bounded(async {
            self.repo
                .find_by_doc_identity(shop_id, IdentityField::DocNo, doc_no)
                .await?
                .ok_or(TransactionError::NotFound)
        })
        .await
    }

    /// Bulk import keyed on DocNo; marks the module dirty once at the end
    pub async fn save_in_batch(
        &self,
        shop_id: &str,
        auth_user: &str,
        items: Vec<T>,
    ) -> TransactionResult<BulkImport> {
        require_shop(shop_id)?;
        let target = DocNoImportTarget { service: self };
        let outcome = self
            .bounded(async {
                Ok(import_batch(
                    &target,
                    shop_id,
                    auth_user,
                    items,
                    self.config.update_failure_policy,
                )
                .await?)
            })
            .await?;

        self.mark_dirty(shop_id);
        Ok(outcome)
    }

    /// Changes since `since`, for incremental sync
    pub async fn last_activity(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> TransactionResult<(LastActivity<T>, Pagination)> {
        self.bounded(async {
            Ok(activity::last_activity(self.repo.as_ref(), shop_id, since, pageable).await?)
        })
        .await
    }

    async fn enrich(&self, shop_id: &str, doc: T) -> TransactionResult<T> {
        match &self.enricher {
            Some(enricher) => Ok(enricher.enrich(shop_id, doc).await?),
            None => Ok(doc),
        }
    }

    fn replicate(&self, event: ReplicationEvent<T>) {
        self.outbox
            .enqueue(Arc::new(ReplicateJob::new(self.sink.clone(), event)));
    }

    fn mark_dirty(&self, shop_id: &str) {
        if let Some(notifier) = &self.notifier {
            self.outbox.enqueue(Arc::new(DirtyModuleJob::new(
                notifier.clone(),
                shop_id,
                self.module_name(),
            )));
        }
    }

    async fn bounded<R, F>(&self, fut: F) -> TransactionResult<R>
    where
        F: Future<Output = TransactionResult<R>>,
    {
        tokio::time::timeout(self.config.context_timeout(), fut)
            .await
            .map_err(|_| TransactionError::Timeout(self.config.context_timeout_ms))?
    }
}

/// Pause before conflict retry `attempt` (1-based), doubling and saturating
fn conflict_pause(base: Duration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_CONFLICT_SHIFT);
    base.saturating_mul(1u32 << shift)
}

fn require_shop(shop_id: &str) -> TransactionResult<()> {
    if shop_id.trim().is_empty() {
        return Err(TransactionError::Validation("shop id is required".into()));
    }
    Ok(())
}
