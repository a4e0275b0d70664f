//! Side-effect delivery errors

use thiserror::Error;

/// Result type for replication and notification deliveries
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Delivery errors. Never reach the caller of a primary write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Broker or notifier could not be reached
    #[error("Delivery target unavailable: {0}")]
    Unavailable(String),

    /// Target refused the message
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Payload could not be encoded
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for DeliveryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<crate::cache::CacheError> for DeliveryError {
    fn from(e: crate::cache::CacheError) -> Self {
        Self::Unavailable(e.to_string())
    }
}
