//! Replication sink that emits each event as a structured log line

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::model::{DocumentPayload, TransactionalDocument};

use super::errors::DeliveryResult;
use super::ReplicationSink;

/// Logs replication events under a topic name instead of publishing them
#[derive(Debug, Clone)]
pub struct TracingReplicationSink {
    topic: String,
}

impl TracingReplicationSink {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    fn emit<P: Serialize + ?Sized>(&self, action: &str, payload: &P) -> DeliveryResult<()> {
        let body = serde_json::to_string(payload)?;
        info!(topic = %self.topic, action, body = %body, "replication event");
        Ok(())
    }
}

#[async_trait]
impl<T: DocumentPayload + Serialize> ReplicationSink<T> for TracingReplicationSink {
    async fn create(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.emit("create", doc)
    }

    async fn update(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.emit("update", doc)
    }

    async fn delete(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.emit("delete", doc)
    }

    async fn delete_in_batch(&self, docs: &[TransactionalDocument<T>]) -> DeliveryResult<()> {
        self.emit("delete_batch", docs)
    }
}
