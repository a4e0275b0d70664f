//! Transactional document service
//!
//! One [`TransactionService`] per module. It owns the write protocol shared by
//! purchases, purchase orders, returns and the stock documents: allocate a
//! DocNo, commit the primary write within a deadline, then queue replication,
//! counter refresh and dirty-module notification on the outbox.

mod batch;
mod errors;
mod service;

use async_trait::async_trait;

use crate::store::StoreResult;

pub use errors::{TransactionError, TransactionResult};
pub use service::TransactionService;

/// Module-specific payload enrichment run before a document is written,
/// e.g. expanding line items with product details.
#[async_trait]
pub trait DetailEnricher<T>: Send + Sync {
    async fn enrich(&self, shop_id: &str, payload: T) -> StoreResult<T>;
}
