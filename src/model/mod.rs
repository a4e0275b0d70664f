//! Document model shared by every transactional module.
//!
//! The business payload (`T`) is opaque to this crate apart from the few
//! accessors in [`DocumentPayload`]. Everything else here is the envelope
//! the core stamps around it: identity, tenant, audit trail and tombstone.

mod activity;
mod bulk;
mod document;
mod module;

pub use activity::{paginate, DeletedActivity, LastActivity, Pageable, Pagination};
pub use bulk::BulkImport;
pub use document::{
    AuditInfo, DocumentPayload, DocumentState, IdentityField, KeyRecord, TransactionPayload,
    TransactionalDocument,
};
pub use module::ModuleKind;

/// Generate a new stable external identity (GuidFixed).
pub fn new_guid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
