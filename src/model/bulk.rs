//! Bulk import report

use serde::{Deserialize, Serialize};

/// Outcome of one bulk-import call. Reported to the client, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    #[serde(rename = "updatefailed")]
    pub update_failed: Vec<String>,
    #[serde(rename = "payloadduplicate")]
    pub payload_duplicate: Vec<String>,
}

impl BulkImport {
    /// True when every submitted item was applied
    pub fn is_clean(&self) -> bool {
        self.update_failed.is_empty() && self.payload_duplicate.is_empty()
    }
}
