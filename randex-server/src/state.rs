use std::{fmt, path::Path, sync::Arc};

use randex_core::{AssetIndex, PathStore};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: PathStore,
    pub index: AssetIndex,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: PathStore, index: AssetIndex) -> Self {
        Self {
            config,
            store,
            index,
        }
    }

    /// Public URL for an indexed absolute path, served under `/assets`.
    /// `None` when the path falls outside the asset root (a stale entry from
    /// before a root reconfiguration).
    pub fn asset_url(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.config.asset_root).ok()?;
        Some(format!(
            "{}/assets/{}",
            self.config.public_url,
            rel.display()
        ))
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
