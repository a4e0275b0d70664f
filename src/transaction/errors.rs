//! Transaction service errors

use thiserror::Error;

use crate::docno::DocNoError;
use crate::store::StoreError;

/// Result type for transaction service operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors a caller of the transaction service can see.
///
/// Delivery failures of replication or notification never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// DocNo allocation failed or collided
    #[error(transparent)]
    DocNo(#[from] DocNoError),

    /// No active document with the requested identity
    #[error("document not found")]
    NotFound,

    /// Storage failure, propagated verbatim
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The primary path exceeded its deadline
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// Request rejected before touching storage
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl TransactionError {
    /// True for DocNo collisions, from the allocator or from storage
    pub fn is_conflict(&self) -> bool {
        match self {
            TransactionError::DocNo(e) => e.is_conflict(),
            TransactionError::Store(e) => e.is_conflict(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransactionError::NotFound)
    }
}
