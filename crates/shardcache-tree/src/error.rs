use std::path::PathBuf;

use shardcache_digest::Digest;

/// Errors from shard tree navigation and maintenance.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// No child boundary of an internal node covers the digest.
    ///
    /// Boundaries always include the all-`f` sentinel, so this means the
    /// directory tree was damaged outside the store.
    #[error("inconsistent shard tree: no boundary under {} covers {digest}", .node.display())]
    InconsistentTree { node: PathBuf, digest: Digest },

    /// A directory in the tree is not named by a valid boundary.
    #[error("invalid boundary name {name:?}: {reason}")]
    InvalidBoundary { name: String, reason: String },

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
