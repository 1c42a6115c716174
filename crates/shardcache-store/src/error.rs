/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The configuration is unusable.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(String),

    /// The key has no stored value.
    #[error("missing key: {0:?}")]
    MissingKey(String),

    /// Shard tree navigation or rebalancing failed.
    #[error("shard tree error: {0}")]
    Tree(#[from] shardcache_tree::TreeError),

    /// Index read or write failed.
    #[error("index error: {0}")]
    Index(#[from] shardcache_index::IndexError),

    /// I/O error on a content file or the store root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
