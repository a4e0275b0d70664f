//! Full bulk-import sequence

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::info;

use crate::model::BulkImport;
use crate::store::StoreResult;

use super::reconcile::{filter_duplicate, prepare_payload_data, update_on_duplicate};
use super::UpdateFailurePolicy;

/// One module's view of its storage, as the importer needs it
#[async_trait]
pub trait ImportTarget: Send + Sync {
    /// Client-supplied item
    type Payload: Clone + Send + Sync + 'static;
    /// Stored record
    type Record: Send + Sync + 'static;

    /// Business key of an item
    fn key(&self, payload: &Self::Payload) -> String;

    /// Business key of a prepared record
    fn record_key(&self, record: &Self::Record) -> String;

    /// Subset of `keys` already stored for the shop
    async fn existing_keys(&self, shop_id: &str, keys: &[String]) -> StoreResult<HashSet<String>>;

    /// Build a new record: identity, tenant, creation stamp
    fn prepare(&self, shop_id: &str, auth_user: &str, payload: Self::Payload) -> Self::Record;

    async fn create_in_batch(&self, records: Vec<Self::Record>) -> StoreResult<()>;

    async fn find(&self, shop_id: &str, key: &str) -> StoreResult<Option<Self::Record>>;

    /// Whether a found record counts as present
    fn exists(&self, _record: &Self::Record) -> bool {
        true
    }

    async fn update(
        &self,
        shop_id: &str,
        auth_user: &str,
        payload: Self::Payload,
        record: Self::Record,
    ) -> StoreResult<()>;
}

/// Reconcile `items` against `target` and report the outcome.
///
/// Failing to read existing keys or to write the new records aborts the
/// import; individual update failures are reported, not raised.
pub async fn import_batch<G>(
    target: &G,
    shop_id: &str,
    auth_user: &str,
    items: Vec<G::Payload>,
    policy: UpdateFailurePolicy,
) -> StoreResult<BulkImport>
where
    G: ImportTarget + ?Sized,
{
    let submitted = items.len();
    let (unique, payload_duplicates) = filter_duplicate(items, |p| target.key(p));

    let keys: Vec<String> = unique.iter().map(|p| target.key(p)).collect();
    let existing = target.existing_keys(shop_id, &keys).await?;

    let (duplicate_items, create_records) = prepare_payload_data(
        shop_id,
        auth_user,
        &existing,
        unique,
        |p| target.key(p),
        |shop, user, p| target.prepare(shop, user, p),
    );

    let created: Vec<String> = create_records.iter().map(|r| target.record_key(r)).collect();
    if !create_records.is_empty() {
        target.create_in_batch(create_records).await?;
    }

    let (update_success, update_fail) =
        update_on_duplicate(target, shop_id, auth_user, duplicate_items, policy).await;

    let outcome = BulkImport {
        created,
        updated: update_success.iter().map(|p| target.key(p)).collect(),
        update_failed: update_fail.iter().map(|p| target.key(p)).collect(),
        payload_duplicate: payload_duplicates.iter().map(|p| target.key(p)).collect(),
    };

    info!(
        shop_id,
        submitted,
        created = outcome.created.len(),
        updated = outcome.updated.len(),
        update_failed = outcome.update_failed.len(),
        payload_duplicate = outcome.payload_duplicate.len(),
        "bulk import reconciled"
    );

    Ok(outcome)
}
