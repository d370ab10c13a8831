//! In-memory category index.
//!
//! One committed item count per category, behind a single lock. The sampler
//! validates requests against this summary without touching the store; the
//! indexer updates it after each committed rebuild.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Shared per-category summary. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct AssetIndex {
    counts: Arc<RwLock<HashMap<String, u64>>>,
}

impl AssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed item count for `category`, or `None` if unknown.
    pub async fn item_count(&self, category: &str) -> Option<u64> {
        self.counts.read().await.get(category).copied()
    }

    pub async fn contains(&self, category: &str) -> bool {
        self.counts.read().await.contains_key(category)
    }

    /// Record the count of a freshly committed generation.
    pub async fn set_item_count(&self, category: &str, count: u64) {
        self.counts
            .write()
            .await
            .insert(category.to_string(), count);
    }

    /// Drop a category. Returns `false` if it was already gone.
    pub async fn remove(&self, category: &str) -> bool {
        self.counts.write().await.remove(category).is_some()
    }

    /// All known category names, sorted for stable listings.
    pub async fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counts.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
