use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shardcache_digest::KeyHasher;

use crate::error::{StoreError, StoreResult};
use crate::expiry::ExpiryPolicy;

/// Default number of content files a leaf may hold before it is split.
pub const DEFAULT_MAX_NODE_FILES: usize = 256;

/// Default index growth, in bytes, between rebalance passes.
pub const DEFAULT_REBALANCE_EVERY_BYTES: u64 = 512;

/// Root path and policy for a [`ShardStore`](crate::ShardStore).
///
/// Can be built in code or loaded from TOML:
///
/// ```toml
/// root = "/var/cache/pages"
/// max_node_files = 256
/// rebalance_every_bytes = 512
/// hasher = "md5"
///
/// [expiry]
/// periods = 30
/// unit = "day"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory owning the shard tree and the index. Created if absent.
    pub root: PathBuf,
    /// Leaves holding more content files than this are split.
    #[serde(default = "default_max_node_files")]
    pub max_node_files: usize,
    /// Index growth that triggers a full rebalance pass. This is measured
    /// in bytes of index file, so it only approximates an entry count.
    #[serde(default = "default_rebalance_every_bytes")]
    pub rebalance_every_bytes: u64,
    /// Age-based expiry. `None` disables sweeping.
    #[serde(default)]
    pub expiry: Option<ExpiryPolicy>,
    /// Hash used to address keys.
    #[serde(default)]
    pub hasher: KeyHasher,
}

fn default_max_node_files() -> usize {
    DEFAULT_MAX_NODE_FILES
}

fn default_rebalance_every_bytes() -> u64 {
    DEFAULT_REBALANCE_EVERY_BYTES
}

impl StoreConfig {
    /// Default policy rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_node_files: DEFAULT_MAX_NODE_FILES,
            rebalance_every_bytes: DEFAULT_REBALANCE_EVERY_BYTES,
            expiry: None,
            hasher: KeyHasher::default(),
        }
    }

    /// Set the expiry policy.
    pub fn with_expiry(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry = Some(policy);
        self
    }

    /// Set the leaf split threshold.
    pub fn with_max_node_files(mut self, max_node_files: usize) -> Self {
        self.max_node_files = max_node_files;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject policies the store cannot run with.
    pub fn validate(&self) -> StoreResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("root path is empty".into()));
        }
        if self.max_node_files == 0 {
            return Err(StoreError::InvalidConfig(
                "max_node_files must be at least 1".into(),
            ));
        }
        if self.rebalance_every_bytes == 0 {
            return Err(StoreError::InvalidConfig(
                "rebalance_every_bytes must be at least 1".into(),
            ));
        }
        if let Some(policy) = &self.expiry {
            if policy.periods == 0 {
                return Err(StoreError::InvalidConfig(
                    "expiry periods must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}
