//! Cache error types

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Cache backend is not reachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}
