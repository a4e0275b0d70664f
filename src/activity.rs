//! Incremental-sync fan-out
//!
//! A sync client asks "what changed since T". The answer is two independent
//! queries, created-or-updated and deleted, run concurrently and merged.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{DocumentPayload, LastActivity, Pageable, Pagination};
use crate::store::{ActivitySource, StoreResult};

/// Changes to a shop's documents at or after `since`.
///
/// Both queries are awaited even when one fails early. A failing deleted
/// query is reported in preference to a failing changed query. The
/// pagination returned is the one with the larger total, so a client pages
/// until both lists are exhausted.
pub async fn last_activity<T, S>(
    source: &S,
    shop_id: &str,
    since: DateTime<Utc>,
    pageable: Pageable,
) -> StoreResult<(LastActivity<T>, Pagination)>
where
    T: DocumentPayload,
    S: ActivitySource<T> + ?Sized,
{
    let (changed, deleted) = tokio::join!(
        source.find_created_or_updated_since(shop_id, since, pageable),
        source.find_deleted_since(shop_id, since, pageable),
    );

    let (remove, deleted_page) = deleted?;
    let (new, changed_page) = changed?;

    let pagination = if deleted_page.total > changed_page.total {
        deleted_page
    } else {
        changed_page
    };

    debug!(
        shop_id,
        new = new.len(),
        remove = remove.len(),
        total = pagination.total,
        "last activity collected"
    );

    Ok((LastActivity { new, remove }, pagination))
}
