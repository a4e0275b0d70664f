//! shopdoc - multi-tenant business document core
//!
//! Batch import reconciliation, sequential document numbering and the
//! commit-then-replicate protocol shared by the transactional modules.

pub mod activity;
pub mod cache;
pub mod cli;
pub mod config;
pub mod docno;
pub mod import;
pub mod model;
pub mod outbox;
pub mod sink;
pub mod store;
pub mod transaction;
