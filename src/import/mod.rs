//! Batch import reconciliation
//!
//! Every bulk-import endpoint merges a client batch against what the shop
//! already stores:
//!
//! 1. [`filter_duplicate`] collapses in-batch repeats (last value wins)
//! 2. existing keys are fetched once
//! 3. [`prepare_payload_data`] splits new from existing
//! 4. new records are written in one batch
//! 5. [`update_on_duplicate`] reconciles the existing half item by item
//!
//! [`import_batch`] runs the whole sequence against an [`ImportTarget`].

mod ordered;
mod pipeline;
mod reconcile;

pub use ordered::OrderedKeyMap;
pub use pipeline::{import_batch, ImportTarget};
pub use reconcile::{
    filter_duplicate, prepare_payload_data, update_on_duplicate, UpdateFailurePolicy,
};
