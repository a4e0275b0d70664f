//! # Store Errors
//!
//! Error types for document repositories.

use thiserror::Error;

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A document in the same shop already carries this DocNo
    #[error("Duplicate DocNo in shop {shop_id}: {doc_no}")]
    DuplicateDocNo { shop_id: String, doc_no: String },

    /// A document in the same shop already carries this GuidFixed
    #[error("Duplicate GuidFixed in shop {shop_id}: {guid_fixed}")]
    DuplicateGuid { shop_id: String, guid_fixed: String },

    /// Target of an update or delete is absent
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Opaque backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// True for uniqueness violations that a caller may retry with a new key
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::DuplicateDocNo { .. })
    }
}
