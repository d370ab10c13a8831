use thiserror::Error;

/// Failure modes of the asset index engine.
///
/// The first three variants are request-level conditions recovered at the
/// API boundary; the rest are operational failures surfaced to the operator.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("{0}")]
    InvalidCount(String),

    #[error("no such category: {0}")]
    CategoryNotFound(String),

    #[error("category {category} only has {available} items, {requested} requested")]
    InsufficientItems {
        category: String,
        requested: u64,
        available: u64,
    },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("watch error: {0}")]
    Watch(String),
}

pub type Result<T> = std::result::Result<T, AssetError>;
