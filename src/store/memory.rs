//! In-memory document store
//!
//! Shop-partitioned, lock-protected. DocNo and GuidFixed uniqueness are
//! checked under the same write lock as the insert, so concurrent creators
//! cannot both commit the same DocNo. A tombstone keeps its DocNo taken.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    paginate, DeletedActivity, DocumentPayload, IdentityField, KeyRecord, Pageable, Pagination,
    TransactionalDocument,
};

use super::errors::{StoreError, StoreResult};
use super::{ActivitySource, DocumentRepository};

type ShopDocuments<T> = HashMap<String, Vec<TransactionalDocument<T>>>;

/// In-process [`DocumentRepository`]
#[derive(Debug)]
pub struct InMemoryDocumentStore<T> {
    shops: RwLock<ShopDocuments<T>>,
}

impl<T> Default for InMemoryDocumentStore<T> {
    fn default() -> Self {
        Self {
            shops: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: DocumentPayload> InMemoryDocumentStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored document of a shop, tombstones included, in insert order
    pub fn snapshot(&self, shop_id: &str) -> StoreResult<Vec<TransactionalDocument<T>>> {
        Ok(self.read()?.get(shop_id).cloned().unwrap_or_default())
    }

    /// Number of active documents in a shop
    pub fn active_count(&self, shop_id: &str) -> StoreResult<usize> {
        Ok(self
            .read()?
            .get(shop_id)
            .map(|docs| docs.iter().filter(|d| d.is_active()).count())
            .unwrap_or(0))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, ShopDocuments<T>>> {
        self.shops.read().map_err(|e| StoreError::backend(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, ShopDocuments<T>>> {
        self.shops.write().map_err(|e| StoreError::backend(e.to_string()))
    }

    fn check_unique(
        existing: &[TransactionalDocument<T>],
        doc: &TransactionalDocument<T>,
    ) -> StoreResult<()> {
        if existing.iter().any(|d| d.guid_fixed == doc.guid_fixed) {
            return Err(StoreError::DuplicateGuid {
                shop_id: doc.shop_id.clone(),
                guid_fixed: doc.guid_fixed.clone(),
            });
        }

        let doc_no = doc.doc_no();
        if !doc_no.is_empty() && existing.iter().any(|d| d.doc_no() == doc_no) {
            return Err(StoreError::DuplicateDocNo {
                shop_id: doc.shop_id.clone(),
                doc_no: doc_no.to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl<T: DocumentPayload> DocumentRepository<T> for InMemoryDocumentStore<T> {
    async fn create(&self, doc: TransactionalDocument<T>) -> StoreResult<String> {
        let mut shops = self.write()?;
        let docs = shops.entry(doc.shop_id.clone()).or_default();
        Self::check_unique(docs, &doc)?;

        let guid = doc.guid_fixed.clone();
        docs.push(doc);
        Ok(guid)
    }

    async fn create_in_batch(&self, batch: Vec<TransactionalDocument<T>>) -> StoreResult<()> {
        let mut shops = self.write()?;

        // Validate the whole batch against storage and itself before writing
        let mut staged: HashMap<String, Vec<TransactionalDocument<T>>> = HashMap::new();
        for doc in batch {
            let existing = shops.get(&doc.shop_id).map(Vec::as_slice).unwrap_or(&[]);
            Self::check_unique(existing, &doc)?;
            let pending = staged.entry(doc.shop_id.clone()).or_default();
            Self::check_unique(pending, &doc)?;
            pending.push(doc);
        }

        for (shop_id, docs) in staged {
            shops.entry(shop_id).or_default().extend(docs);
        }
        Ok(())
    }

    async fn update(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        doc: TransactionalDocument<T>,
    ) -> StoreResult<()> {
        let mut shops = self.write()?;
        let docs = shops
            .get_mut(shop_id)
            .ok_or_else(|| StoreError::NotFound(guid_fixed.to_string()))?;

        let doc_no = doc.doc_no();
        if !doc_no.is_empty()
            && docs
                .iter()
                .any(|d| d.guid_fixed != guid_fixed && d.doc_no() == doc_no)
        {
            return Err(StoreError::DuplicateDocNo {
                shop_id: shop_id.to_string(),
                doc_no: doc_no.to_string(),
            });
        }

        let slot = docs
            .iter_mut()
            .find(|d| d.guid_fixed == guid_fixed && d.is_active())
            .ok_or_else(|| StoreError::NotFound(guid_fixed.to_string()))?;
        *slot = doc;
        Ok(())
    }

    async fn find_by_guid(
        &self,
        shop_id: &str,
        guid_fixed: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        self.find_by_doc_identity(shop_id, IdentityField::GuidFixed, guid_fixed)
            .await
    }

    async fn find_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
    ) -> StoreResult<Vec<TransactionalDocument<T>>> {
        let wanted: HashSet<&str> = guids.iter().map(String::as_str).collect();
        Ok(self
            .read()?
            .get(shop_id)
            .map(|docs| {
                docs.iter()
                    .filter(|d| wanted.contains(d.guid_fixed.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_doc_identity(
        &self,
        shop_id: &str,
        field: IdentityField,
        value: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        Ok(self.read()?.get(shop_id).and_then(|docs| {
            docs.iter()
                .find(|d| d.is_active() && d.identity(field) == value)
                .cloned()
        }))
    }

    async fn doc_no_taken(&self, shop_id: &str, doc_no: &str) -> StoreResult<bool> {
        Ok(self
            .read()?
            .get(shop_id)
            .is_some_and(|docs| docs.iter().any(|d| d.doc_no() == doc_no)))
    }

    async fn find_last_doc_no(
        &self,
        shop_id: &str,
        prefix: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        Ok(self.read()?.get(shop_id).and_then(|docs| {
            docs.iter()
                .filter(|d| d.doc_no().starts_with(prefix))
                .max_by(|a, b| a.doc_no().cmp(b.doc_no()))
                .cloned()
        }))
    }

    async fn find_in_item_guid(
        &self,
        shop_id: &str,
        field: IdentityField,
        keys: &[String],
    ) -> StoreResult<Vec<KeyRecord>> {
        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        Ok(self
            .read()?
            .get(shop_id)
            .map(|docs| {
                docs.iter()
                    .filter(|d| wanted.contains(d.identity(field)))
                    .map(|d| KeyRecord {
                        guid_fixed: d.guid_fixed.clone(),
                        value: d.identity(field).to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_by_guid(
        &self,
        shop_id: &str,
        guid_fixed: &str,
        deleted_by: &str,
    ) -> StoreResult<()> {
        let mut shops = self.write()?;
        let doc = shops
            .get_mut(shop_id)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|d| d.guid_fixed == guid_fixed && d.is_active())
            })
            .ok_or_else(|| StoreError::NotFound(guid_fixed.to_string()))?;
        doc.mark_deleted(deleted_by, Utc::now());
        Ok(())
    }

    async fn delete_by_guids(
        &self,
        shop_id: &str,
        guids: &[String],
        deleted_by: &str,
    ) -> StoreResult<usize> {
        let wanted: HashSet<&str> = guids.iter().map(String::as_str).collect();
        let now = Utc::now();
        let mut shops = self.write()?;
        let mut count = 0;
        if let Some(docs) = shops.get_mut(shop_id) {
            for doc in docs
                .iter_mut()
                .filter(|d| d.is_active() && wanted.contains(d.guid_fixed.as_str()))
            {
                doc.mark_deleted(deleted_by, now);
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl<T: DocumentPayload> ActivitySource<T> for InMemoryDocumentStore<T> {
    async fn find_created_or_updated_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<TransactionalDocument<T>>, Pagination)> {
        let mut changed: Vec<_> = self
            .read()?
            .get(shop_id)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.is_active() && d.audit.last_changed_at() >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        changed.sort_by_key(|d| d.audit.last_changed_at());
        Ok(paginate(changed, pageable))
    }

    async fn find_deleted_since(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        pageable: Pageable,
    ) -> StoreResult<(Vec<DeletedActivity>, Pagination)> {
        let mut removed: Vec<DeletedActivity> = self
            .read()?
            .get(shop_id)
            .map(|docs| {
                docs.iter()
                    .filter_map(|d| {
                        let deleted_at = d.audit.deleted_at.filter(|at| *at >= since)?;
                        Some(DeletedActivity {
                            guid_fixed: d.guid_fixed.clone(),
                            shop_id: d.shop_id.clone(),
                            deleted_by: d.audit.deleted_by.clone(),
                            deleted_at,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        removed.sort_by_key(|d| d.deleted_at);
        Ok(paginate(removed, pageable))
    }
}
