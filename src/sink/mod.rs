//! Post-commit delivery targets
//!
//! [`ReplicationSink`] publishes committed documents to downstream
//! consumers; [`SyncNotifier`] flags a shop's module as changed for the
//! full-sync process. Both are only invoked from outbox jobs, after the
//! primary write has committed.

mod errors;
mod memory;
mod tracing_sink;

use async_trait::async_trait;

use crate::model::TransactionalDocument;

pub use errors::{DeliveryError, DeliveryResult};
pub use memory::{MemoryReplicationSink, MemorySyncNotifier};
pub use tracing_sink::TracingReplicationSink;

/// A committed change to publish
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationEvent<T> {
    Created(TransactionalDocument<T>),
    Updated(TransactionalDocument<T>),
    Deleted(TransactionalDocument<T>),
    DeletedBatch(Vec<TransactionalDocument<T>>),
}

impl<T> ReplicationEvent<T> {
    /// Short name used in logs and topics
    pub fn action(&self) -> &'static str {
        match self {
            ReplicationEvent::Created(_) => "create",
            ReplicationEvent::Updated(_) => "update",
            ReplicationEvent::Deleted(_) => "delete",
            ReplicationEvent::DeletedBatch(_) => "delete_batch",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReplicationEvent::DeletedBatch(docs) => docs.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Message-queue producer for one module's documents
#[async_trait]
pub trait ReplicationSink<T>: Send + Sync {
    async fn create(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()>;

    async fn update(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()>;

    async fn delete(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()>;

    async fn delete_in_batch(&self, docs: &[TransactionalDocument<T>]) -> DeliveryResult<()>;
}

/// Dirty-module signal for downstream full sync
#[async_trait]
pub trait SyncNotifier: Send + Sync {
    async fn save(&self, shop_id: &str, module_name: &str) -> DeliveryResult<()>;
}
