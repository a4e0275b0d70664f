//! Bounded job queue with retrying workers

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_channel::{Receiver, Sender, TrySendError};
use futures_util::future::join_all;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::config::OutboxConfig;
use super::job::OutboxJob;

/// Largest doubling exponent applied to the initial backoff
const MAX_BACKOFF_SHIFT: u32 = 20;

/// How often `wait_idle` re-checks the pending count
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Why a job ended up in the dead-letter list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// Every attempt failed
    Exhausted,
    /// The queue was at capacity when the job was enqueued
    QueueFull,
    /// The outbox was shut down
    Closed,
}

/// A job that will not be delivered unless re-driven
#[derive(Clone)]
pub struct DeadLetter {
    pub job: Arc<dyn OutboxJob>,
    pub attempts: u32,
    pub reason: DeadLetterReason,
    pub last_error: Option<String>,
}

impl fmt::Debug for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetter")
            .field("job", &self.job.describe())
            .field("attempts", &self.attempts)
            .field("reason", &self.reason)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    pub enqueued: u64,
    pub delivered: u64,
    /// Failed attempts that were followed by another attempt
    pub retried: u64,
    /// Jobs moved to the dead-letter list, rejected ones included
    pub dead_lettered: u64,
    /// Jobs refused at enqueue
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
    rejected: AtomicU64,
}

struct Shared {
    config: OutboxConfig,
    /// Enqueued and not yet finished, in the channel or in a worker
    pending: AtomicUsize,
    counters: Counters,
    dead: Mutex<VecDeque<DeadLetter>>,
}

/// Post-commit side-effect queue.
///
/// Jobs are accepted without blocking and delivered by `workers` tasks,
/// each retried with capped exponential backoff. Nothing here ever reports
/// back to the request that produced the job.
pub struct Outbox {
    shared: Arc<Shared>,
    sender: Sender<Arc<dyn OutboxJob>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Outbox {
    /// Create the queue and spawn its workers on the current runtime
    pub fn start(config: OutboxConfig) -> Arc<Self> {
        let (sender, receiver) = async_channel::bounded(config.capacity.max(1));
        let worker_count = config.workers.max(1);

        let shared = Arc::new(Shared {
            config,
            pending: AtomicUsize::new(0),
            counters: Counters::default(),
            dead: Mutex::new(VecDeque::new()),
        });

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(worker(id, shared.clone(), receiver.clone())))
            .collect();

        Arc::new(Self {
            shared,
            sender,
            workers: Mutex::new(workers),
        })
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.shared.config
    }

    /// Queue a job. Returns `false` when it was dead-lettered instead.
    pub fn enqueue(&self, job: Arc<dyn OutboxJob>) -> bool {
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        match self.sender.try_send(job) {
            Ok(()) => {
                self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.shared.pending.fetch_sub(1, Ordering::SeqCst);
                let (reason, job) = match e {
                    TrySendError::Full(job) => (DeadLetterReason::QueueFull, job),
                    TrySendError::Closed(job) => (DeadLetterReason::Closed, job),
                };
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                error!(
                    kind = %job.kind(),
                    job = %job.describe(),
                    ?reason,
                    "outbox rejected job"
                );
                self.shared.dead_letter(DeadLetter {
                    job,
                    attempts: 0,
                    reason,
                    last_error: None,
                });
                false
            }
        }
    }

    /// Jobs waiting in the channel
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn stats(&self) -> OutboxStats {
        let c = &self.shared.counters;
        OutboxStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            retried: c.retried.load(Ordering::Relaxed),
            dead_lettered: c.dead_lettered.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }

    /// Copy of the dead-letter list, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.shared
            .dead
            .lock()
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Move every dead letter back onto the queue; returns how many were accepted
    pub fn redrive(&self) -> usize {
        let letters = match self.shared.dead.lock() {
            Ok(mut dead) => std::mem::take(&mut *dead),
            Err(e) => {
                error!(error = %e, "dead-letter list unavailable");
                return 0;
            }
        };

        letters
            .into_iter()
            .filter(|letter| self.enqueue(letter.job.clone()))
            .count()
    }

    /// Resolve once every accepted job has been delivered or dead-lettered
    pub async fn wait_idle(&self) {
        while self.shared.pending.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    /// Stop accepting jobs, drain what is queued, and join the workers
    pub async fn shutdown(&self) {
        self.sender.close();

        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(e) => {
                error!(error = %e, "outbox worker list unavailable");
                return;
            }
        };

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "outbox worker panicked");
            }
        }
    }
}

impl Shared {
    async fn deliver(&self, worker: usize, job: Arc<dyn OutboxJob>) {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match job.run().await {
                Ok(()) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        worker,
                        attempt,
                        kind = %job.kind(),
                        job = %job.describe(),
                        "outbox job delivered"
                    );
                    return;
                }
                Err(e) if attempt < max_attempts => {
                    let pause = self.backoff(attempt);
                    self.counters.retried.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        worker,
                        attempt,
                        kind = %job.kind(),
                        job = %job.describe(),
                        error = %e,
                        pause_ms = pause.as_millis() as u64,
                        "outbox job failed, retrying"
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        worker,
                        attempt,
                        kind = %job.kind(),
                        job = %job.describe(),
                        error = %e,
                        "outbox job exhausted its attempts"
                    );
                    self.dead_letter(DeadLetter {
                        job,
                        attempts: attempt,
                        reason: DeadLetterReason::Exhausted,
                        last_error: Some(e.to_string()),
                    });
                    return;
                }
            }
        }
    }

    /// Pause after the `attempt`-th failure
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        let nominal = self
            .config
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.config.max_backoff_ms);

        let ms = if self.config.jitter && nominal > 1 {
            rand::thread_rng().gen_range(nominal / 2..=nominal)
        } else {
            nominal
        };
        Duration::from_millis(ms)
    }

    fn dead_letter(&self, letter: DeadLetter) {
        self.counters.dead_lettered.fetch_add(1, Ordering::Relaxed);

        match self.dead.lock() {
            Ok(mut dead) => {
                if dead.len() >= self.config.dead_letter_capacity.max(1) {
                    if let Some(dropped) = dead.pop_front() {
                        warn!(
                            job = %dropped.job.describe(),
                            "dead-letter list full, oldest dropped"
                        );
                    }
                }
                dead.push_back(letter);
            }
            Err(e) => {
                error!(
                    error = %e,
                    job = %letter.job.describe(),
                    "dead-letter list unavailable, job lost"
                );
            }
        }
    }
}

async fn worker(id: usize, shared: Arc<Shared>, receiver: Receiver<Arc<dyn OutboxJob>>) {
    while let Ok(job) = receiver.recv().await {
        shared.deliver(id, job).await;
        shared.pending.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(worker = id, "outbox worker stopped");
}
