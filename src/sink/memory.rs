//! In-memory delivery targets

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{DocumentPayload, TransactionalDocument};

use super::errors::{DeliveryError, DeliveryResult};
use super::{ReplicationEvent, ReplicationSink, SyncNotifier};

/// Records every published event in order
#[derive(Debug)]
pub struct MemoryReplicationSink<T> {
    events: Mutex<Vec<ReplicationEvent<T>>>,
}

impl<T> Default for MemoryReplicationSink<T> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<T: DocumentPayload> MemoryReplicationSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far
    pub fn events(&self) -> Vec<ReplicationEvent<T>> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: ReplicationEvent<T>) -> DeliveryResult<()> {
        self.events
            .lock()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?
            .push(event);
        Ok(())
    }
}

#[async_trait]
impl<T: DocumentPayload> ReplicationSink<T> for MemoryReplicationSink<T> {
    async fn create(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.push(ReplicationEvent::Created(doc.clone()))
    }

    async fn update(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.push(ReplicationEvent::Updated(doc.clone()))
    }

    async fn delete(&self, doc: &TransactionalDocument<T>) -> DeliveryResult<()> {
        self.push(ReplicationEvent::Deleted(doc.clone()))
    }

    async fn delete_in_batch(&self, docs: &[TransactionalDocument<T>]) -> DeliveryResult<()> {
        self.push(ReplicationEvent::DeletedBatch(docs.to_vec()))
    }
}

/// Tracks which `(shop, module)` pairs were marked dirty and how often
#[derive(Debug, Default)]
pub struct MemorySyncNotifier {
    saves: Mutex<HashMap<(String, String), u64>>,
}

impl MemorySyncNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self, shop_id: &str, module_name: &str) -> bool {
        self.save_count(shop_id, module_name) > 0
    }

    pub fn save_count(&self, shop_id: &str, module_name: &str) -> u64 {
        self.saves
            .lock()
            .ok()
            .and_then(|s| {
                s.get(&(shop_id.to_string(), module_name.to_string()))
                    .copied()
            })
            .unwrap_or(0)
    }

    /// Modules marked dirty for a shop
    pub fn dirty_modules(&self, shop_id: &str) -> HashSet<String> {
        self.saves
            .lock()
            .map(|s| {
                s.keys()
                    .filter(|(shop, _)| shop == shop_id)
                    .map(|(_, module)| module.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SyncNotifier for MemorySyncNotifier {
    async fn save(&self, shop_id: &str, module_name: &str) -> DeliveryResult<()> {
        *self
            .saves
            .lock()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?
            .entry((shop_id.to_string(), module_name.to_string()))
            .or_insert(0) += 1;
        Ok(())
    }
}
