//! Post-commit outbox
//!
//! Replication, counter refresh and dirty-module notification are queued
//! here once the primary write has committed, then delivered by background
//! workers with retry. Failures end in the dead-letter list, never in the
//! caller's result.

mod config;
mod job;
mod queue;

pub use config::OutboxConfig;
pub use job::{CounterRefreshJob, DirtyModuleJob, JobKind, OutboxJob, ReplicateJob};
pub use queue::{DeadLetter, DeadLetterReason, Outbox, OutboxStats};
