//! Outbox tuning

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult};

/// Queue size, worker count and retry schedule for post-commit jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Jobs buffered before enqueue starts rejecting (default: 1024)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Concurrent delivery tasks (default: 2)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Attempts per job, first one included (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after the first failure, doubled per attempt (default: 50)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any single pause (default: 5000)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Randomize each pause between half and all of its nominal value
    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Dead letters retained; the oldest are dropped beyond this (default: 1024)
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

fn default_capacity() -> usize {
    1024
}

fn default_workers() -> usize {
    2
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_jitter() -> bool {
    true
}

fn default_dead_letter_capacity() -> usize {
    1024
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: default_jitter(),
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}

impl OutboxConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid("outbox.capacity", "must be > 0"));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("outbox.workers", "must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("outbox.max_attempts", "must be > 0"));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "outbox.max_backoff_ms",
                "must be >= initial_backoff_ms",
            ));
        }
        Ok(())
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
