//! Random distinct-id sampling over the committed index.

use std::collections::HashSet;
use std::path::PathBuf;

use futures::future::join_all;
use rand::Rng;
use tracing::warn;

use crate::error::{AssetError, Result};
use crate::index::AssetIndex;
use crate::store::PathStore;

/// Exclusive upper bound for a sample request. Rejection sampling degrades as
/// the requested count approaches the category size; the bound keeps it
/// harmless.
pub const MAX_SAMPLE_COUNT: u64 = 100;

/// Draw `count` distinct random assets from `category`.
///
/// Validation happens before any store access: the count bounds, then
/// category existence, then sufficiency against the committed item count.
/// Each drawn id resolves independently; an id that no longer resolves
/// (a rebuild raced the request) yields `None` in its slot instead of
/// failing the whole sample. Slot `i` always holds the result for the
/// `i`-th drawn id.
pub async fn sample(
    index: &AssetIndex,
    store: &PathStore,
    category: &str,
    count: u64,
) -> Result<Vec<Option<PathBuf>>> {
    if count == 0 {
        return Err(AssetError::InvalidCount(
            "count must be a positive integer".to_string(),
        ));
    }
    if count >= MAX_SAMPLE_COUNT {
        return Err(AssetError::InvalidCount(format!(
            "count must be less than {MAX_SAMPLE_COUNT}"
        )));
    }

    let Some(total) = index.item_count(category).await else {
        return Err(AssetError::CategoryNotFound(category.to_string()));
    };
    if count > total {
        return Err(AssetError::InsufficientItems {
            category: category.to_string(),
            requested: count,
            available: total,
        });
    }

    let ids = draw_distinct(total, count as usize);

    if let [id] = ids[..] {
        return Ok(vec![resolve(store, category, id).await]);
    }

    // Fan out one lookup per id and join before returning; result order
    // follows the draw order, not completion order.
    let lookups = ids.iter().map(|&id| resolve(store, category, id));
    Ok(join_all(lookups).await)
}

/// Single-asset convenience for the redirect mode: the first resolved path.
pub async fn sample_one(
    index: &AssetIndex,
    store: &PathStore,
    category: &str,
    count: u64,
) -> Result<Option<PathBuf>> {
    let paths = sample(index, store, category, count).await?;
    Ok(paths.into_iter().flatten().next())
}

async fn resolve(store: &PathStore, category: &str, id: i64) -> Option<PathBuf> {
    match store.get(category, id).await {
        Ok(path) => path,
        Err(err) => {
            warn!(category, id, %err, "asset lookup failed");
            None
        }
    }
}

/// Distinct ids in `1..=total`, drawn uniformly by rejection sampling:
/// redraw on collision until `count` unique ids are collected.
fn draw_distinct(total: u64, count: usize) -> Vec<i64> {
    let mut rng = rand::rng();
    let mut chosen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);

    while ids.len() < count {
        let candidate = rng.random_range(1..=total as i64);
        if chosen.insert(candidate) {
            ids.push(candidate);
        }
    }

    ids
}
