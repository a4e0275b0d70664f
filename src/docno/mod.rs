//! Sequential document number allocation
//!
//! DocNo = module code + `YYYYMMDD` + zero-padded sequence, unique per shop.
//! The counter for each `(shop, prefix)` is read from the cache when warm
//! and recomputed from the greatest stored DocNo otherwise. Every candidate
//! is checked against storage before it is handed out; the storage insert
//! itself is the final arbiter under concurrency.

mod allocator;
mod errors;
mod prefix;

pub use allocator::{Allocation, CounterSource, DocNoAllocator, DEFAULT_DOC_NO_WIDTH};
pub use errors::{DocNoError, DocNoResult};
pub use prefix::{doc_no_prefix, format_doc_no, parse_sequence};
