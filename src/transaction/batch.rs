//! Bulk import of transactional documents, keyed on DocNo

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;

use crate::import::ImportTarget;
use crate::model::{new_guid, DocumentPayload, IdentityField, TransactionalDocument};
use crate::store::StoreResult;

use super::service::TransactionService;

/// A module's repository seen as an import target
pub(super) struct DocNoImportTarget<'a, T> {
    pub(super) service: &'a TransactionService<T>,
}

#[async_trait]
impl<'a, T: DocumentPayload> ImportTarget for DocNoImportTarget<'a, T> {
    type Payload = T;
    type Record = TransactionalDocument<T>;

    fn key(&self, payload: &T) -> String {
        payload.doc_no().to_string()
    }

    fn record_key(&self, record: &TransactionalDocument<T>) -> String {
        record.doc_no().to_string()
    }

    async fn existing_keys(&self, shop_id: &str, keys: &[String]) -> StoreResult<HashSet<String>> {
        let found = self
            .service
            .repository()
            .find_in_item_guid(shop_id, IdentityField::DocNo, keys)
            .await?;
        Ok(found.into_iter().map(|k| k.value).collect())
    }

    fn prepare(&self, shop_id: &str, auth_user: &str, payload: T) -> TransactionalDocument<T> {
        TransactionalDocument::new(shop_id, new_guid(), payload, auth_user, Utc::now())
    }

    async fn create_in_batch(&self, records: Vec<TransactionalDocument<T>>) -> StoreResult<()> {
        self.service.repository().create_in_batch(records).await
    }

    async fn find(
        &self,
        shop_id: &str,
        key: &str,
    ) -> StoreResult<Option<TransactionalDocument<T>>> {
        self.service
            .repository()
            .find_by_doc_identity(shop_id, IdentityField::DocNo, key)
            .await
    }

    fn exists(&self, record: &TransactionalDocument<T>) -> bool {
        !record.doc_no().is_empty()
    }

    async fn update(
        &self,
        shop_id: &str,
        auth_user: &str,
        payload: T,
        mut record: TransactionalDocument<T>,
    ) -> StoreResult<()> {
        record.apply_update(payload, auth_user, Utc::now());
        let guid = record.guid_fixed.clone();
        self.service
            .repository()
            .update(shop_id, &guid, record)
            .await
    }
}
