//! DocNo counter cache
//!
//! Holds the last allocated sequence per `(shop, prefix)`. Purely an
//! optimization: a miss, a zero, or an error all mean "ask storage".

mod errors;
mod ttl;

use std::time::Duration;

use async_trait::async_trait;

pub use errors::{CacheError, CacheResult};
pub use ttl::TtlCounterCache;

/// Counter cache contract
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Last allocated sequence, if cached and not expired
    async fn get(&self, shop_id: &str, prefix: &str) -> CacheResult<Option<u64>>;

    /// Store the last allocated sequence for `ttl`
    async fn save(&self, shop_id: &str, prefix: &str, value: u64, ttl: Duration)
        -> CacheResult<()>;

    /// Store `value` only if it is above the live cached value, as one atomic
    /// step. Returns whether the counter was written.
    async fn save_if_greater(
        &self,
        shop_id: &str,
        prefix: &str,
        value: u64,
        ttl: Duration,
    ) -> CacheResult<bool>;
}
