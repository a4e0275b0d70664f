//! DocNo allocation errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for DocNo allocation
pub type DocNoResult<T> = Result<T, DocNoError>;

/// DocNo allocation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocNoError {
    /// The computed candidate is already carried by a stored document
    #[error("DocNo is exists: {doc_no}")]
    Exists { doc_no: String },

    /// Storage lookup failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DocNoError {
    /// True when a fresh allocation could succeed
    pub fn is_conflict(&self) -> bool {
        match self {
            DocNoError::Exists { .. } => true,
            DocNoError::Store(e) => e.is_conflict(),
        }
    }
}
