//! Document repository seam
//!
//! The coordinator, allocator and importer only see these traits. Query
//! construction and pagination against a real document database live behind
//! them; [`InMemoryDocumentStore`] is the in-process implementation.

mod errors;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    DeletedActivity, IdentityField, KeyRecord, Pageable, Pagination, TransactionalDocument,
};

pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;

/// Persistence contract for one module's documents.
///
/// Lookups return `None` for absence; absence is never an error.
/// Reads skip tombstoned documents unless stated otherwise.
#[async_trait]
pub trait DocumentRepository<T>: ActivitySource<T> + Send + Sync {
    /// Insert a document. Must reject a DocNo or GuidFixed already used by any
    /// document of the same shop, tombstones included, atomically with the
    /// insert.
    async fn create(&self, doc: TransactionalDocument<T>) -> StoreResult<String>;

    /// Insert many documents in one write, all or nothing
    async fn create_in_batch(&self, docs: Vec<TransactionalDocument<T>>) -> StoreResult<()>;

    /// Replace the stored document with the given identity
    async fn update(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        doc: TransactionalDocument<T>,
    ) -> StoreResult<()>;

    async fn find_by_guid(
        &self,
        shop_id: &str,
        guid_fixed: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>>;

    /// Fetch by identity, tombstoned documents included
    async fn find_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
    ) -> StoreResult<Vec<TransactionalDocument<T>>>;

    async fn find_by_doc_identity(
        &self,
        shop_id: &str,
        field: IdentityField,
        value: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>>;

    /// Whether any document of the shop carries `doc_no`, tombstoned or not
    async fn doc_no_taken(&self, shop_id: &str, doc_no: &str) -> StoreResult<bool>;

    /// Document with the lexicographically greatest DocNo starting with `prefix`,
    /// tombstoned documents included so a number is never handed out twice
    async fn find_last_doc_no(
        &self,
        shop_id: &str,
        prefix: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>>;

    /// Which of `keys` are already taken under `field`, tombstones included
    async fn find_in_item_guid(
        &self,
        shop_id: &str,
        field: IdentityField,
        keys: &[String],
    ) -> StoreResult<Vec<KeyRecord>>;

    /// Tombstone one document
    async fn delete_by_guid(&self, shop_id: &str, guid_fixed: &str, deleted_by: &str)
        -> StoreResult<()>;

    /// Tombstone every listed document that is still active; returns how many
    async fn delete_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
        deleted_by: &str,
    ) -> StoreResult<usize>;
}

/// Change feeds backing incremental sync
#[async_trait]
pub trait ActivitySource<T>: Send + Sync {
    /// Active documents created or updated at or after `since`
    async fn find_created_or_updated_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<TransactionalDocument<T>>, Pagination)>;

    /// Documents tombstoned at or after `since`
    async fn find_deleted_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<DeletedActivity>, Pagination)>;
}
