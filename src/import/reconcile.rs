//! Partitioning primitives

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ordered::OrderedKeyMap;
use super::pipeline::ImportTarget;

/// What a failed update of an existing record counts as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFailurePolicy {
    /// The item is reported in `updatefailed`
    #[default]
    Report,
    /// The error is logged and the item is reported in `updated`
    Tolerate,
}

/// Split `items` into one value per key and the repeats.
///
/// The first occurrence of a key claims its slot; each later occurrence is
/// pushed to the duplicates and overwrites the slot. `unique` is ordered by
/// first occurrence and carries the last value per key.
pub fn filter_duplicate<T, F>(items: Vec<T>, key_fn: F) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let mut unique = OrderedKeyMap::new();
    let mut duplicates = Vec::new();

    for item in items {
        let key = key_fn(&item);
        if unique.contains_key(&key) {
            duplicates.push(item.clone());
        }
        unique.insert(key, item);
    }

    (unique.into_values(), duplicates)
}

/// Route keys already in storage to the update side, prepare the rest.
///
/// Returns `(duplicate_items, create_items)`. `prepare_fn` stamps creation
/// audit fields and identity; it does no I/O.
pub fn prepare_payload_data<T, D, K, P>(
    shop_id: &str,
    auth_user: &str,
    existing_keys: &HashSet<String>,
    items: Vec<T>,
    key_fn: K,
    prepare_fn: P,
) -> (Vec<T>, Vec<D>)
where
    K: Fn(&T) -> String,
    P: Fn(&str, &str, T) -> D,
{
    let mut duplicate_items = Vec::new();
    let mut create_items = Vec::new();

    for item in items {
        if existing_keys.contains(&key_fn(&item)) {
            duplicate_items.push(item);
        } else {
            create_items.push(prepare_fn(shop_id, auth_user, item));
        }
    }

    (duplicate_items, create_items)
}

/// Apply each existing-key item onto its stored record.
///
/// Returns `(update_success, update_fail)`. Items whose record cannot be
/// found, fails [`ImportTarget::exists`], or whose lookup errors always
/// fail. Items whose update errors are routed by `policy`.
pub async fn update_on_duplicate<G>(
    target: &G,
    shop_id: &str,
    auth_user: &str,
    items: Vec<G::Payload>,
    policy: UpdateFailurePolicy,
) -> (Vec<G::Payload>, Vec<G::Payload>)
where
    G: ImportTarget + ?Sized,
{
    let mut success = Vec::new();
    let mut fail = Vec::new();

    for item in items {
        let key = target.key(&item);

        let found = match target.find(shop_id, &key).await {
            Ok(Some(record)) if target.exists(&record) => record,
            Ok(_) => {
                fail.push(item);
                continue;
            }
            Err(e) => {
                warn!(shop_id, key = %key, error = %e, "import lookup failed");
                fail.push(item);
                continue;
            }
        };

        match target.update(shop_id, auth_user, item.clone(), found).await {
            Ok(()) => success.push(item),
            Err(e) => {
                warn!(shop_id, key = %key, error = %e, ?policy, "import update failed");
                match policy {
                    UpdateFailurePolicy::Report => fail.push(item),
                    UpdateFailurePolicy::Tolerate => success.push(item),
                }
            }
        }
    }

    (success, fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        code: &'static str,
        n: u32,
    }

    fn row(code: &'static str, n: u32) -> Row {
        Row { code, n }
    }

    #[test]
    fn test_filter_duplicate_keeps_last_value_per_key() {
        let items = vec![row("A", 1), row("B", 2), row("A", 3), row("A", 4)];
        let (unique, duplicates) = filter_duplicate(items, |r| r.code.to_string());

        assert_eq!(unique, vec![row("A", 4), row("B", 2)]);
        assert_eq!(duplicates, vec![row("A", 3), row("A", 4)]);
    }

    #[test]
    fn test_filter_duplicate_empty() {
        let (unique, duplicates) = filter_duplicate(Vec::<Row>::new(), |r| r.code.to_string());
        assert!(unique.is_empty());
        assert!(duplicates.is_empty());
    }

    #[test]
    fn test_prepare_payload_data_partitions_by_existence() {
        let existing: HashSet<String> = ["B".to_string()].into_iter().collect();
        let items = vec![row("A", 1), row("B", 2), row("C", 3)];

        let (dups, created) = prepare_payload_data(
            "shop1",
            "alice",
            &existing,
            items,
            |r| r.code.to_string(),
            |shop, user, r| format!("{}:{}:{}", shop, user, r.code),
        );

        assert_eq!(dups, vec![row("B", 2)]);
        assert_eq!(created, vec!["shop1:alice:A", "shop1:alice:C"]);
    }
}
