//! In-process TTL counter cache

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::errors::{CacheError, CacheResult};
use super::CacheRepository;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    expires_at: Instant,
}

/// Map of `(shop, prefix)` to counter with per-entry expiry.
///
/// Uses tokio's clock so paused-time tests can drive expiry.
#[derive(Debug, Default)]
pub struct TtlCounterCache {
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl TtlCounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, HashMap<(String, String), Entry>>> {
        self.entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CacheRepository for TtlCounterCache {
    async fn get(&self, shop_id: &str, prefix: &str) -> CacheResult<Option<u64>> {
        let key = (shop_id.to_string(), prefix.to_string());
        let mut entries = self.lock()?;
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value)),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        shop_id: &str,
        prefix: &str,
        value: u64,
        ttl: Duration,
    ) -> CacheResult<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock()?
            .insert((shop_id.to_string(), prefix.to_string()), entry);
        Ok(())
    }

    async fn save_if_greater(
        &self,
        shop_id: &str,
        prefix: &str,
        value: u64,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let key = (shop_id.to_string(), prefix.to_string());

        if let Some(current) = entries.get(&key) {
            if current.expires_at > now && current.value >= value {
                return Ok(false);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }
}
