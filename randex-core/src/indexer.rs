//! Directory indexer.
//!
//! Walks one category's subtree, applies the optional extension allow-list,
//! and commits the resulting path list as a fresh store generation. Ids are
//! assigned by pre-order traversal sequence starting at 1; the walk order is
//! the ordering contract, so ids are not stable across rebuilds.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::fs;
use tracing::{error, info, warn};

use crate::error::{AssetError, Result};
use crate::fs_watch::WatchRegistrar;
use crate::index::AssetIndex;
use crate::store::PathStore;

/// Rebuilds category generations from the filesystem.
pub struct Indexer {
    store: PathStore,
    index: AssetIndex,
    asset_root: PathBuf,
    extensions: HashSet<String>,
    registrar: Arc<dyn WatchRegistrar>,
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexer")
            .field("asset_root", &self.asset_root)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Indexer {
    /// `extensions` is a lowercase allow-list without dots; empty indexes
    /// every regular file. Directories encountered during a walk are handed
    /// to `registrar` so the watch set grows with the tree.
    pub fn new(
        store: PathStore,
        index: AssetIndex,
        asset_root: PathBuf,
        extensions: HashSet<String>,
        registrar: Arc<dyn WatchRegistrar>,
    ) -> Self {
        Self {
            store,
            index,
            asset_root,
            extensions,
            registrar,
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn store(&self) -> &PathStore {
        &self.store
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    /// Startup pass: every directory directly under the asset root becomes a
    /// category. A category that fails to scan is logged and skipped; the
    /// whole pass fails only when the asset root itself is unreadable.
    pub async fn scan_all(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.asset_root).await.map_err(|err| {
            AssetError::Scan(format!(
                "cannot read asset root {}: {err}",
                self.asset_root.display()
            ))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable root entry");
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }

            let Some(category) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %path.display(), "skipping non-UTF-8 directory name");
                continue;
            };

            if let Err(err) = self.rebuild_category(&category).await {
                error!(category, %err, "initial scan failed for category");
            }
        }

        Ok(())
    }

    /// Scan one category's subtree and commit the result as a new generation.
    ///
    /// An unreadable category root fails the rebuild and leaves the previous
    /// generation (and its in-memory count) authoritative. Unreadable entries
    /// deeper in the tree are skipped and the walk continues.
    pub async fn rebuild_category(&self, category: &str) -> Result<u64> {
        let root = self.asset_root.join(category);
        self.registrar.register(&root);

        let mut found = Vec::new();
        self.walk(&root, &mut found).await.map_err(|err| {
            AssetError::Scan(format!("cannot read category root {}: {err}", root.display()))
        })?;

        let count = self.store.rebuild(category, &found).await?;
        self.index.set_item_count(category, count).await;
        info!(category, count, "category rebuilt");
        Ok(count)
    }

    fn walk<'a>(
        &'a self,
        dir: &'a Path,
        found: &'a mut Vec<PathBuf>,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = fs::read_dir(dir).await?;

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(dir = %dir.display(), %err, "directory listing interrupted");
                        break;
                    }
                };

                let path = entry.path();
                // Follows symlinks, and doubles as the vanished-entry check.
                let metadata = match fs::metadata(&path).await {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "skipping unreadable entry");
                        continue;
                    }
                };

                if metadata.is_dir() {
                    self.registrar.register(&path);
                    if let Err(err) = self.walk(&path, found).await {
                        warn!(dir = %path.display(), %err, "skipping unreadable subtree");
                    }
                } else if metadata.is_file() && self.matches_filter(&path) {
                    found.push(path);
                }
            }

            Ok(())
        })
    }

    fn matches_filter(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}
