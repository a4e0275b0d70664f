//! Post-commit jobs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheRepository;
use crate::model::DocumentPayload;
use crate::sink::{DeliveryResult, ReplicationEvent, ReplicationSink, SyncNotifier};

/// Job categories, for stats and dead-letter inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Replicate,
    CounterRefresh,
    MarkDirty,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobKind::Replicate => "replicate",
            JobKind::CounterRefresh => "counter_refresh",
            JobKind::MarkDirty => "mark_dirty",
        })
    }
}

/// A side effect that runs after its primary write committed.
///
/// `run` may be called several times for the same job; implementations
/// must tolerate redelivery.
#[async_trait]
pub trait OutboxJob: Send + Sync {
    fn kind(&self) -> JobKind;

    /// One-line summary for logs
    fn describe(&self) -> String;

    async fn run(&self) -> DeliveryResult<()>;
}

/// Publish a committed change to the replication sink
pub struct ReplicateJob<T> {
    sink: Arc<dyn ReplicationSink<T>>,
    event: ReplicationEvent<T>,
}

impl<T: DocumentPayload> ReplicateJob<T> {
    pub fn new(sink: Arc<dyn ReplicationSink<T>>, event: ReplicationEvent<T>) -> Self {
        Self { sink, event }
    }

    pub fn event(&self) -> &ReplicationEvent<T> {
        &self.event
    }
}

#[async_trait]
impl<T: DocumentPayload> OutboxJob for ReplicateJob<T> {
    fn kind(&self) -> JobKind {
        JobKind::Replicate
    }

    fn describe(&self) -> String {
        format!("replicate {} ({} docs)", self.event.action(), self.event.len())
    }

    async fn run(&self) -> DeliveryResult<()> {
        match &self.event {
            ReplicationEvent::Created(doc) => self.sink.create(doc).await,
            ReplicationEvent::Updated(doc) => self.sink.update(doc).await,
            ReplicationEvent::Deleted(doc) => self.sink.delete(doc).await,
            ReplicationEvent::DeletedBatch(docs) => self.sink.delete_in_batch(docs).await,
        }
    }
}

/// Record the latest allocated sequence in the counter cache
pub struct CounterRefreshJob {
    cache: Arc<dyn CacheRepository>,
    shop_id: String,
    prefix: String,
    seq: u64,
    ttl: Duration,
}

impl CounterRefreshJob {
    pub fn new(
        cache: Arc<dyn CacheRepository>,
        shop_id: impl Into<String>,
        prefix: impl Into<String>,
        seq: u64,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            shop_id: shop_id.into(),
            prefix: prefix.into(),
            seq,
            ttl,
        }
    }
}

#[async_trait]
impl OutboxJob for CounterRefreshJob {
    fn kind(&self) -> JobKind {
        JobKind::CounterRefresh
    }

    fn describe(&self) -> String {
        format!("counter {}/{} -> {}", self.shop_id, self.prefix, self.seq)
    }

    async fn run(&self) -> DeliveryResult<()> {
        // Refreshes can land out of order on different workers
        let written = self
            .cache
            .save_if_greater(&self.shop_id, &self.prefix, self.seq, self.ttl)
            .await?;
        if !written {
            debug!(
                shop_id = %self.shop_id,
                prefix = %self.prefix,
                seq = self.seq,
                "counter already ahead, refresh skipped"
            );
        }
        Ok(())
    }
}

/// Flag a shop's module as changed for full sync
pub struct DirtyModuleJob {
    notifier: Arc<dyn SyncNotifier>,
    shop_id: String,
    module_name: String,
}

impl DirtyModuleJob {
    pub fn new(
        notifier: Arc<dyn SyncNotifier>,
        shop_id: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            shop_id: shop_id.into(),
            module_name: module_name.into(),
        }
    }
}

#[async_trait]
impl OutboxJob for DirtyModuleJob {
    fn kind(&self) -> JobKind {
        JobKind::MarkDirty
    }

    fn describe(&self) -> String {
        format!("mark dirty {}/{}", self.shop_id, self.module_name)
    }

    async fn run(&self) -> DeliveryResult<()> {
        self.notifier.save(&self.shop_id, &self.module_name).await
    }
}
