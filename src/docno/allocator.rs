//! DocNo allocator

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::CacheRepository;
use crate::model::DocumentPayload;
use crate::store::DocumentRepository;

use super::errors::{DocNoError, DocNoResult};
use super::prefix::{doc_no_prefix, format_doc_no, parse_sequence};

/// Digits in the sequence suffix
pub const DEFAULT_DOC_NO_WIDTH: usize = 5;

/// Where the previous sequence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSource {
    Cache,
    Storage,
}

/// An allocated, not yet persisted, DocNo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub doc_no: String,
    pub seq: u64,
    pub prefix: String,
    pub source: CounterSource,
}

/// Per-module DocNo allocator.
///
/// Holds no counter state of its own; the cache and repository are
/// injected so each module (and each test) owns its counters.
pub struct DocNoAllocator<T> {
    module_code: String,
    width: usize,
    repo: Arc<dyn DocumentRepository<T>>,
    cache: Arc<dyn CacheRepository>,
}

impl<T: DocumentPayload> DocNoAllocator<T> {
    pub fn new(
        module_code: impl Into<String>,
        repo: Arc<dyn DocumentRepository<T>>,
        cache: Arc<dyn CacheRepository>,
    ) -> Self {
        Self {
            module_code: module_code.into(),
            width: DEFAULT_DOC_NO_WIDTH,
            repo,
            cache,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn module_code(&self) -> &str {
        &self.module_code
    }

    /// Prefix for documents dated `date`
    pub fn prefix(&self, date: DateTime<Utc>) -> String {
        doc_no_prefix(&self.module_code, date)
    }

    /// Next DocNo for `(shop_id, prefix)`, cache first.
    ///
    /// Does not write anything: the caller persists the document and then
    /// refreshes the cache with [`Allocation::seq`].
    pub async fn allocate(&self, shop_id: &str, prefix: &str) -> DocNoResult<Allocation> {
        match self.cache.get(shop_id, prefix).await {
            Ok(Some(previous)) if previous > 0 => {
                self.verify(shop_id, prefix, previous, CounterSource::Cache)
                    .await
            }
            Ok(_) => self.allocate_from_storage(shop_id, prefix).await,
            Err(e) => {
                debug!(shop_id, prefix, error = %e, "counter cache read failed, using storage");
                self.allocate_from_storage(shop_id, prefix).await
            }
        }
    }

    /// Next DocNo for `(shop_id, prefix)` computed from storage only
    pub async fn allocate_from_storage(
        &self,
        shop_id: &str,
        prefix: &str,
    ) -> DocNoResult<Allocation> {
        let previous = self.previous_from_storage(shop_id, prefix).await?;
        self.verify(shop_id, prefix, previous, CounterSource::Storage)
            .await
    }

    async fn previous_from_storage(&self, shop_id: &str, prefix: &str) -> DocNoResult<u64> {
        let Some(last) = self.repo.find_last_doc_no(shop_id, prefix).await? else {
            return Ok(0);
        };

        match parse_sequence(last.doc_no(), prefix) {
            Some(seq) => Ok(seq),
            None => {
                // Not an error: numbering restarts, the collision check
                // below still guards against reissuing a live number.
                warn!(
                    shop_id,
                    prefix,
                    doc_no = last.doc_no(),
                    "unparseable DocNo suffix, sequence restarts at 1"
                );
                Ok(0)
            }
        }
    }

    async fn verify(
        &self,
        shop_id: &str,
        prefix: &str,
        previous: u64,
        source: CounterSource,
    ) -> DocNoResult<Allocation> {
        let seq = previous.saturating_add(1);
        let doc_no = format_doc_no(prefix, seq, self.width);

        // Tombstoned numbers count as taken
        if self.repo.doc_no_taken(shop_id, &doc_no).await? {
            return Err(DocNoError::Exists { doc_no });
        }

        debug!(shop_id, prefix, seq, ?source, "allocated DocNo candidate");
        Ok(Allocation {
            doc_no,
            seq,
            prefix: prefix.to_string(),
            source,
        })
    }
}
