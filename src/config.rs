//! Core configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! production defaults below.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::docno::DEFAULT_DOC_NO_WIDTH;
use crate::import::UpdateFailurePolicy;
use crate::outbox::OutboxConfig;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config: {0}")]
    Read(String),

    /// File is not valid JSON for this schema
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A field holds a value outside its allowed range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Settings shared by every transactional module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Deadline for the primary path of one request (default: 15000)
    #[serde(default = "default_context_timeout_ms")]
    pub context_timeout_ms: u64,

    /// Lifetime of a cached DocNo counter (default: 24h)
    #[serde(default = "default_doc_no_cache_ttl_secs")]
    pub doc_no_cache_ttl_secs: u64,

    /// Digits in the DocNo sequence suffix (default: 5)
    #[serde(default = "default_doc_no_width")]
    pub doc_no_width: usize,

    /// Storage-side reallocations after a DocNo collision (default: 3)
    #[serde(default = "default_docno_conflict_retries")]
    pub docno_conflict_retries: u32,

    /// Base pause between reallocations, doubled per attempt (default: 20)
    #[serde(default = "default_conflict_backoff_ms")]
    pub conflict_backoff_ms: u64,

    /// How bulk import counts failed updates (default: "report")
    #[serde(default)]
    pub update_failure_policy: UpdateFailurePolicy,

    #[serde(default)]
    pub outbox: OutboxConfig,
}

fn default_context_timeout_ms() -> u64 {
    15_000
}

fn default_doc_no_cache_ttl_secs() -> u64 {
    86_400
}

fn default_doc_no_width() -> usize {
    DEFAULT_DOC_NO_WIDTH
}

fn default_docno_conflict_retries() -> u32 {
    3
}

fn default_conflict_backoff_ms() -> u64 {
    20
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            context_timeout_ms: default_context_timeout_ms(),
            doc_no_cache_ttl_secs: default_doc_no_cache_ttl_secs(),
            doc_no_width: default_doc_no_width(),
            docno_conflict_retries: default_docno_conflict_retries(),
            conflict_backoff_ms: default_conflict_backoff_ms(),
            update_failure_policy: UpdateFailurePolicy::default(),
            outbox: OutboxConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: CoreConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.context_timeout_ms == 0 {
            return Err(ConfigError::invalid("context_timeout_ms", "must be > 0"));
        }
        if self.doc_no_cache_ttl_secs == 0 {
            return Err(ConfigError::invalid("doc_no_cache_ttl_secs", "must be > 0"));
        }
        if !(1..=18).contains(&self.doc_no_width) {
            return Err(ConfigError::invalid(
                "doc_no_width",
                format!("{} is outside 1..=18", self.doc_no_width),
            ));
        }
        self.outbox.validate()
    }

    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }

    pub fn doc_no_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.doc_no_cache_ttl_secs)
    }

    pub fn conflict_backoff(&self) -> Duration {
        Duration::from_millis(self.conflict_backoff_ms)
    }
}
