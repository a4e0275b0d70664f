//! Transactional document envelope

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accessors the core needs from a module payload.
///
/// The DocNo lives inside the payload (it is part of what clients send and
/// receive), so the envelope reads and writes it through this trait.
pub trait DocumentPayload: Clone + Send + Sync + 'static {
    /// Current document number, empty when not yet allocated
    fn doc_no(&self) -> &str;

    /// Overwrite the document number
    fn set_doc_no(&mut self, doc_no: String);

    /// Business date of the document; drives the DocNo prefix
    fn doc_datetime(&self) -> DateTime<Utc>;
}

/// Identity fields a document can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    /// Stable external identity
    GuidFixed,
    /// Human-readable sequential document number
    DocNo,
}

impl IdentityField {
    /// Storage field name
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::GuidFixed => "guidfixed",
            IdentityField::DocNo => "docno",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection returned by key lookups: which document holds which key value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(rename = "guidfixed")]
    pub guid_fixed: String,
    pub value: String,
}

/// Lifecycle state at this layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Active,
    /// Tombstoned; terminal
    Deleted,
}

/// Audit stamps and tombstone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    #[serde(rename = "createdby", default)]
    pub created_by: String,
    #[serde(rename = "createdat", default)]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedby", default, skip_serializing_if = "String::is_empty")]
    pub updated_by: String,
    #[serde(rename = "updatedat", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "deletedby", default, skip_serializing_if = "String::is_empty")]
    pub deleted_by: String,
    #[serde(rename = "deletedat", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuditInfo {
    /// Creation stamp
    pub fn created(by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            created_by: by.into(),
            created_at: at,
            ..Default::default()
        }
    }

    /// Most recent change: update, creation, or tombstone
    pub fn last_changed_at(&self) -> DateTime<Utc> {
        let mut latest = self.created_at;
        for ts in [self.updated_at, self.deleted_at].into_iter().flatten() {
            if ts > latest {
                latest = ts;
            }
        }
        latest
    }
}

/// A persisted transactional document: identity + tenant + payload + audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionalDocument<T> {
    #[serde(rename = "guidfixed")]
    pub guid_fixed: String,
    #[serde(rename = "shopid")]
    pub shop_id: String,
    #[serde(flatten)]
    pub body: T,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

impl<T: DocumentPayload> TransactionalDocument<T> {
    /// Build a freshly created record
    pub fn new(
        shop_id: impl Into<String>,
        guid_fixed: impl Into<String>,
        body: T,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            guid_fixed: guid_fixed.into(),
            shop_id: shop_id.into(),
            body,
            audit: AuditInfo::created(created_by, created_at),
        }
    }

    pub fn doc_no(&self) -> &str {
        self.body.doc_no()
    }

    /// Value of the given identity field
    pub fn identity(&self, field: IdentityField) -> &str {
        match field {
            IdentityField::GuidFixed => &self.guid_fixed,
            IdentityField::DocNo => self.body.doc_no(),
        }
    }

    pub fn state(&self) -> DocumentState {
        if self.audit.deleted_at.is_some() {
            DocumentState::Deleted
        } else {
            DocumentState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == DocumentState::Active
    }

    /// Replace the payload, keeping the stored DocNo, and stamp the update
    pub fn apply_update(&mut self, mut body: T, updated_by: impl Into<String>, at: DateTime<Utc>) {
        body.set_doc_no(self.body.doc_no().to_string());
        self.body = body;
        self.audit.updated_by = updated_by.into();
        self.audit.updated_at = Some(at);
    }

    /// Write the tombstone. A second call keeps the first stamp.
    pub fn mark_deleted(&mut self, deleted_by: impl Into<String>, at: DateTime<Utc>) {
        if self.audit.deleted_at.is_none() {
            self.audit.deleted_by = deleted_by.into();
            self.audit.deleted_at = Some(at);
        }
    }
}

/// Generic transactional payload used by the stock and purchasing modules
/// when no richer domain type is plugged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    #[serde(rename = "docno", default)]
    pub doc_no: String,
    #[serde(rename = "docdatetime")]
    pub doc_datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub details: Vec<Value>,
}

impl TransactionPayload {
    pub fn new(doc_datetime: DateTime<Utc>) -> Self {
        Self {
            doc_no: String::new(),
            doc_datetime,
            description: String::new(),
            details: Vec::new(),
        }
    }

    pub fn with_doc_no(mut self, doc_no: impl Into<String>) -> Self {
        self.doc_no = doc_no.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl DocumentPayload for TransactionPayload {
    fn doc_no(&self) -> &str {
        &self.doc_no
    }

    fn set_doc_no(&mut self, doc_no: String) {
        self.doc_no = doc_no;
    }

    fn doc_datetime(&self) -> DateTime<Utc> {
        self.doc_datetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn test_update_preserves_doc_no() {
        let body = TransactionPayload::new(at(8)).with_doc_no("PU2024010200001");
        let mut doc = TransactionalDocument::new("shop1", "g1", body, "alice", at(8));

        let incoming = TransactionPayload::new(at(9))
            .with_doc_no("SOMETHING-ELSE")
            .with_description("edited");
        doc.apply_update(incoming, "bob", at(10));

        assert_eq!(doc.doc_no(), "PU2024010200001");
        assert_eq!(doc.body.description, "edited");
        assert_eq!(doc.audit.updated_by, "bob");
        assert_eq!(doc.audit.updated_at, Some(at(10)));
    }

    #[test]
    fn test_tombstone_is_terminal() {
        let body = TransactionPayload::new(at(8));
        let mut doc = TransactionalDocument::new("shop1", "g1", body, "alice", at(8));
        assert_eq!(doc.state(), DocumentState::Active);

        doc.mark_deleted("bob", at(11));
        doc.mark_deleted("carol", at(12));

        assert_eq!(doc.state(), DocumentState::Deleted);
        assert_eq!(doc.audit.deleted_by, "bob");
        assert_eq!(doc.audit.last_changed_at(), at(11));
    }

    #[test]
    fn test_wire_field_names() {
        let body = TransactionPayload::new(at(8)).with_doc_no("AJ2024010200003");
        let doc = TransactionalDocument::new("shop1", "g1", body, "alice", at(8));
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["guidfixed"], "g1");
        assert_eq!(json["shopid"], "shop1");
        assert_eq!(json["docno"], "AJ2024010200003");
        assert_eq!(json["createdby"], "alice");
        assert!(json.get("deletedat").is_none());
    }
}
