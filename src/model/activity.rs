//! Incremental-sync activity types and page bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::TransactionalDocument;

/// Page request (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pageable {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl Pageable {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.limit) as usize
    }
}

/// Page metadata returned alongside a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    #[serde(rename = "perPage")]
    pub per_page: u64,
    #[serde(rename = "totalPage")]
    pub total_page: u64,
}

impl Pagination {
    pub fn new(total: u64, pageable: Pageable) -> Self {
        let per_page = pageable.limit.max(1);
        Self {
            total,
            page: pageable.page.max(1),
            per_page,
            total_page: total.div_ceil(per_page),
        }
    }
}

/// Slice an already-ordered result set into the requested page
pub fn paginate<T>(items: Vec<T>, pageable: Pageable) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(items.len() as u64, pageable);
    let page = items
        .into_iter()
        .skip(pageable.offset())
        .take(pageable.limit.max(1) as usize)
        .collect();
    (page, pagination)
}

/// Tombstone projection for sync clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedActivity {
    #[serde(rename = "guidfixed")]
    pub guid_fixed: String,
    #[serde(rename = "shopid")]
    pub shop_id: String,
    #[serde(rename = "deletedby")]
    pub deleted_by: String,
    #[serde(rename = "deletedat")]
    pub deleted_at: DateTime<Utc>,
}

/// Changes since a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastActivity<T> {
    pub new: Vec<TransactionalDocument<T>>,
    pub remove: Vec<DeletedActivity>,
}

impl<T> Default for LastActivity<T> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            remove: Vec::new(),
        }
    }
}
