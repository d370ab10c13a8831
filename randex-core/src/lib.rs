//! # Randex Core
//!
//! The asset index and invalidation engine behind the randex server:
//!
//! - [`store::PathStore`] — persistent `(category, id) -> path` generations,
//!   atomically replaced per rebuild
//! - [`index::AssetIndex`] — in-memory per-category item counts
//! - [`indexer::Indexer`] — directory walks that commit fresh generations
//! - [`fs_watch::WatchService`] — debounced, per-category rebuild triggering
//!   driven by filesystem notifications
//! - [`sampler`] — distinct random-id sampling over the committed index

pub mod error;
pub mod fs_watch;
pub mod index;
pub mod indexer;
pub mod sampler;
pub mod store;

pub use error::{AssetError, Result};
pub use fs_watch::{NoopRegistrar, WatchConfig, WatchRegistrar, WatchService};
pub use index::AssetIndex;
pub use indexer::Indexer;
pub use sampler::{MAX_SAMPLE_COUNT, sample, sample_one};
pub use store::PathStore;
