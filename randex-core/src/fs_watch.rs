//! Filesystem watch pipeline.
//!
//! A thin wrapper around `notify` that turns raw filesystem notifications
//! into debounced per-category rebuilds. Each watched directory is registered
//! non-recursively; the indexer grows the watch set as it discovers
//! subdirectories, and the router does the same when a directory creation
//! event arrives. Removal of a category's root directory bypasses debouncing
//! and tears the category down immediately.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};

use crate::error::{AssetError, Result};
use crate::index::AssetIndex;
use crate::indexer::Indexer;
use crate::store::PathStore;

/// Configuration knobs for watch processing.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Quiet period after the last change event before a category rebuild
    /// fires. Any event arriving inside the window re-arms it in full.
    pub debounce_window: Duration,
    /// Capacity of the raw event channel between notify and the router.
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(300),
            channel_capacity: 1024,
        }
    }
}

/// Change kinds the invalidator reacts to. Everything else notify emits is
/// dropped at conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Written,
    Removed,
}

/// A single normalized filesystem change.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Sink for directory registrations discovered during scans.
pub trait WatchRegistrar: Send + Sync {
    fn register(&self, path: &Path);
}

/// Registrar used when no watch pipeline is running (tests, one-shot scans).
#[derive(Debug, Default)]
pub struct NoopRegistrar;

impl WatchRegistrar for NoopRegistrar {
    fn register(&self, _path: &Path) {}
}

/// Registrar backed by a live notify watcher. Each directory is watched
/// non-recursively; re-registering an already-watched path is harmless.
pub struct NotifyRegistrar {
    watcher: StdMutex<RecommendedWatcher>,
}

impl NotifyRegistrar {
    fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher: StdMutex::new(watcher),
        }
    }

    fn watch(&self, path: &Path) -> notify::Result<()> {
        let mut watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        watcher.watch(path, RecursiveMode::NonRecursive)
    }
}

impl WatchRegistrar for NotifyRegistrar {
    fn register(&self, path: &Path) {
        if let Err(err) = self.watch(path) {
            warn!(path = %path.display(), %err, "failed to watch directory");
        }
    }
}

impl fmt::Debug for NotifyRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NotifyRegistrar")
    }
}

/// Owns the notify watcher and the event router.
pub struct WatchService {
    indexer: Arc<Indexer>,
    router: JoinHandle<()>,
}

impl fmt::Debug for WatchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchService")
            .field("router_finished", &self.router.is_finished())
            .finish_non_exhaustive()
    }
}

impl WatchService {
    /// Build the watcher, register the asset root, and start the router.
    ///
    /// The returned service keeps the watcher alive; the caller should hold
    /// it for the lifetime of the process. The initial `scan_all` pass is the
    /// caller's move: `service.indexer().scan_all().await`.
    pub fn start(
        config: WatchConfig,
        store: PathStore,
        index: AssetIndex,
        asset_root: PathBuf,
        extensions: HashSet<String>,
    ) -> Result<WatchService> {
        let (tx, rx) = mpsc::channel::<ChangeEvent>(config.channel_capacity.max(1));

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for change in convert_event(event) {
                        if tx.blocking_send(change).is_err() {
                            return;
                        }
                    }
                }
                // Stream errors are logged and the watch loop keeps running.
                Err(err) => warn!(%err, "filesystem watch error"),
            },
            NotifyConfig::default(),
        )
        .map_err(|err| AssetError::Watch(format!("failed to create watcher: {err}")))?;

        let registrar = Arc::new(NotifyRegistrar::new(watcher));
        registrar.watch(&asset_root).map_err(|err| {
            AssetError::Watch(format!("failed to watch {}: {err}", asset_root.display()))
        })?;

        let indexer = Arc::new(Indexer::new(
            store,
            index,
            asset_root,
            extensions,
            registrar.clone(),
        ));
        let router = spawn_router(rx, Arc::clone(&indexer), registrar, config.debounce_window);

        Ok(WatchService { indexer, router })
    }

    pub fn indexer(&self) -> Arc<Indexer> {
        Arc::clone(&self.indexer)
    }

    /// Stop routing events. Workers drain and exit; a rebuild that already
    /// started runs to completion.
    pub fn shutdown(self) {
        self.router.abort();
    }
}

/// Where an event landed relative to the asset root.
struct EventTarget {
    category: String,
    is_category_root: bool,
}

fn categorize(asset_root: &Path, path: &Path) -> Option<EventTarget> {
    let rel = path.strip_prefix(asset_root).ok()?;
    let mut components = rel.components();
    let category = match components.next()? {
        Component::Normal(name) => name.to_str()?.to_string(),
        _ => return None,
    };
    Some(EventTarget {
        category,
        is_category_root: components.next().is_none(),
    })
}

fn convert_event(event: Event) -> Vec<ChangeEvent> {
    let change = |path: &PathBuf, kind| ChangeEvent {
        path: path.clone(),
        kind,
    };

    match event.kind {
        EventKind::Create(_) => event
            .paths
            .first()
            .map(|path| vec![change(path, ChangeKind::Created)])
            .unwrap_or_default(),
        EventKind::Remove(_) => event
            .paths
            .first()
            .map(|path| vec![change(path, ChangeKind::Removed)])
            .unwrap_or_default(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::new();
            if let Some(old) = event.paths.first() {
                changes.push(change(old, ChangeKind::Removed));
            }
            if let Some(new) = event.paths.get(1) {
                changes.push(change(new, ChangeKind::Created));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .first()
            .map(|path| vec![change(path, ChangeKind::Removed)])
            .unwrap_or_default(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .first()
            .map(|path| vec![change(path, ChangeKind::Created)])
            .unwrap_or_default(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .map(|path| change(path, ChangeKind::Written))
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn spawn_router(
    rx: mpsc::Receiver<ChangeEvent>,
    indexer: Arc<Indexer>,
    registrar: Arc<dyn WatchRegistrar>,
    window: Duration,
) -> JoinHandle<()> {
    tokio::spawn(route_events(rx, indexer, registrar, window))
}

/// Single consumer of the raw event stream. Owns the per-category worker
/// registry, which serializes all debounce-state mutations.
async fn route_events(
    mut rx: mpsc::Receiver<ChangeEvent>,
    indexer: Arc<Indexer>,
    registrar: Arc<dyn WatchRegistrar>,
    window: Duration,
) {
    let mut workers: HashMap<String, mpsc::Sender<()>> = HashMap::new();

    while let Some(event) = rx.recv().await {
        debug!(path = %event.path.display(), kind = ?event.kind, "filesystem change");

        let Some(target) = categorize(indexer.asset_root(), &event.path) else {
            continue;
        };

        if event.kind == ChangeKind::Removed && target.is_category_root {
            // Dropping the sender cancels any pending debounce window.
            workers.remove(&target.category);
            remove_category(&indexer, &target.category).await;
            continue;
        }

        if event.kind == ChangeKind::Created
            && fs::metadata(&event.path)
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false)
        {
            // The watch set grows with the tree.
            registrar.register(&event.path);
        }

        touch_category(&mut workers, &indexer, target.category, window);
    }
}

async fn remove_category(indexer: &Arc<Indexer>, category: &str) {
    let known = indexer.index().remove(category).await;
    if let Err(err) = indexer.store().delete_category(category).await {
        error!(category, %err, "failed to delete category from store");
        return;
    }
    if known {
        info!(category, "category directory removed, index entry dropped");
    } else {
        debug!(category, "remove event for unknown category ignored");
    }
}

fn touch_category(
    workers: &mut HashMap<String, mpsc::Sender<()>>,
    indexer: &Arc<Indexer>,
    category: String,
    window: Duration,
) {
    let tx = workers
        .entry(category.clone())
        .or_insert_with(|| spawn_worker(category.clone(), Arc::clone(indexer), window));

    match tx.try_send(()) {
        Ok(()) => {}
        // A full channel means a touch is already pending; the burst is
        // coalesced either way.
        Err(mpsc::error::TrySendError::Full(())) => {}
        Err(mpsc::error::TrySendError::Closed(())) => {
            let tx = spawn_worker(category.clone(), Arc::clone(indexer), window);
            let _ = tx.try_send(());
            workers.insert(category, tx);
        }
    }
}

fn spawn_worker(category: String, indexer: Arc<Indexer>, window: Duration) -> mpsc::Sender<()> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(category_worker(category, indexer, window, rx));
    tx
}

/// Per-category debounce state machine. Idle until the first touch; then
/// every further touch re-arms a full quiet window. When the window elapses
/// the rebuild runs to completion; a closed channel (category removed or
/// pipeline shutdown) exits without rebuilding.
async fn category_worker(
    category: String,
    indexer: Arc<Indexer>,
    window: Duration,
    mut rx: mpsc::Receiver<()>,
) {
    loop {
        if rx.recv().await.is_none() {
            return;
        }

        loop {
            match timeout(window, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        info!(category, "change burst settled, rebuilding");
        if let Err(err) = indexer.rebuild_category(&category).await {
            // Previous generation stays authoritative; the next change event
            // retries.
            error!(category, %err, "rebuild failed");
        }
    }
}
