use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use shardcache_digest::Digest;
use shardcache_index::{IndexEntry, IndexLog};
use shardcache_tree::{RebalanceReport, ShardTree};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::CacheStore;

/// Point-in-time counts for a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreStats {
    /// Lines in the index (live keys).
    pub keys: usize,
    /// Leaf directories in the shard tree.
    pub leaves: usize,
    /// Size of the index file in bytes.
    pub index_bytes: u64,
}

/// File-backed cache store over a self-rebalancing shard tree.
///
/// Every operation that reads or changes the tree or the index holds the
/// store lock, and [`ShardTree::rebalance`] takes the same lock for each
/// split. Independent handles on different roots share nothing.
pub struct ShardStore {
    config: StoreConfig,
    tree: ShardTree,
    index: IndexLog,
    lock: Mutex<()>,
}

impl ShardStore {
    /// Open (or create) a store and sweep expired entries as of today.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.root)?;

        let tree = ShardTree::new(config.root.clone(), config.max_node_files);
        let index = IndexLog::new(&config.root);
        let store = Self {
            config,
            tree,
            index,
            lock: Mutex::new(()),
        };
        info!(
            root = %store.root().display(),
            max_node_files = store.config.max_node_files,
            hasher = %store.config.hasher,
            "opened shard store"
        );

        store.invalidate_expired(None)?;
        Ok(store)
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Digest of `key` under this store's hasher.
    pub fn digest(&self, key: &str) -> Digest {
        self.config.hasher.digest(key)
    }

    /// Path of the content file for `key` in the current tree.
    ///
    /// Stable until the next split of the leaf it points into.
    pub fn store_id(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.tree.content_path(&self.digest(key))?)
    }

    /// Like [`CacheStore::retrieve`], but a miss is [`StoreError::MissingKey`].
    pub fn retrieve_or_fail(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.retrieve(key)?
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))
    }

    /// Every index entry, in file order.
    pub fn entries(&self) -> StoreResult<Vec<IndexEntry>> {
        let _guard = self.guard();
        Ok(self.index.scan()?)
    }

    /// Remove every entry stored before the expiry cutoff. Returns the
    /// removed keys, sorted.
    ///
    /// The cutoff is `as_of` (today if `None`) minus the configured expiry
    /// period. Without an expiry policy this does nothing.
    pub fn invalidate_expired(&self, as_of: Option<NaiveDate>) -> StoreResult<Vec<String>> {
        let Some(policy) = self.config.expiry else {
            return Ok(Vec::new());
        };
        let cutoff = policy.cutoff(as_of.unwrap_or_else(today));

        let mut expired: Vec<String> = self
            .entries()?
            .into_iter()
            .filter(|entry| entry.date < cutoff)
            .map(|entry| entry.key)
            .collect();
        expired.sort();
        expired.dedup();
        if expired.is_empty() {
            debug!(%cutoff, "no expired entries");
            return Ok(expired);
        }

        let keys: Vec<&str> = expired.iter().map(String::as_str).collect();
        self.remove_many(&keys)?;
        info!(count = expired.len(), %cutoff, %policy, "removed expired entries");
        Ok(expired)
    }

    /// Delete every content file and the index. Returns the number of
    /// content files deleted.
    ///
    /// Shard directories are left in place, so the tree keeps its shape.
    pub fn empty(&self) -> StoreResult<usize> {
        let _guard = self.guard();
        let files = self.tree.content_files()?;
        for file in &files {
            fs::remove_file(file)?;
        }
        self.index.clear()?;
        info!(files = files.len(), "emptied shard store");
        Ok(files.len())
    }

    /// Split every overloaded leaf. Must not be called while holding the
    /// store lock.
    pub fn rebalance(&self) -> StoreResult<RebalanceReport> {
        Ok(self.tree.rebalance(&self.lock)?)
    }

    /// Current key, leaf and index-size counts.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let _guard = self.guard();
        Ok(StoreStats {
            keys: self.index.scan()?.len(),
            leaves: self.tree.leaf_count()?,
            index_bytes: self.index.size_bytes()?,
        })
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().expect("store lock poisoned")
    }

    /// A pass is due when the index grew across a multiple of the cadence,
    /// or when the leaf that just gained a file is over the threshold.
    fn should_rebalance(
        &self,
        path: &Path,
        is_new: bool,
        index_before: u64,
        index_after: u64,
    ) -> StoreResult<bool> {
        if !is_new {
            return Ok(false);
        }
        let cadence = self.config.rebalance_every_bytes;
        if index_after / cadence > index_before / cadence {
            return Ok(true);
        }
        match path.parent() {
            Some(leaf) => Ok(self.tree.is_overloaded(leaf)?),
            None => Ok(false),
        }
    }

    fn remove_content(&self, key: &str, digest: &Digest) -> StoreResult<()> {
        let path = self.tree.content_path(digest)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::MissingKey(key.to_string()),
            _ => StoreError::Io(e),
        })
    }
}

impl CacheStore for ShardStore {
    fn has_key(&self, key: &str) -> StoreResult<bool> {
        Ok(self.store_id(key)?.is_file())
    }

    fn add(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        // Best effort: checked before the lock, so two racing first adds of
        // one key can both index it.
        let is_new = !self.has_key(key)?;
        let digest = self.digest(key);

        let (path, index_before, index_after) = {
            let _guard = self.guard();
            let path = self.tree.content_path(&digest)?;
            fs::write(&path, value)?;
            let before = self.index.size_bytes()?;
            let after = if is_new {
                self.index
                    .append(&IndexEntry::new(today(), digest.clone(), key))?
            } else {
                before
            };
            (path, before, after)
        };
        debug!(%digest, bytes = value.len(), is_new, "add");

        if self.should_rebalance(&path, is_new, index_before, index_after)? {
            self.rebalance()?;
        }
        Ok(())
    }

    fn retrieve(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let digest = self.digest(key);
        let _guard = self.guard();
        let path = self.tree.content_path(&digest)?;
        match fs::read(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%digest, "retrieve miss");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.remove_many(&[key])
    }

    /// Deletes content files in order and stops at the first failure. The
    /// index is rewritten once, for every file that was deleted, before any
    /// error is returned.
    fn remove_many(&self, keys: &[&str]) -> StoreResult<()> {
        let _guard = self.guard();
        let mut removed = HashSet::new();
        let mut failure = None;
        for &key in keys {
            let digest = self.digest(key);
            match self.remove_content(key, &digest) {
                Ok(()) => {
                    removed.insert(digest);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let dropped = self.index.rewrite_without(&removed)?;
        debug!(removed = removed.len(), dropped, "remove");
        failure.map_or(Ok(()), Err)
    }

    fn list_keys(&self) -> StoreResult<Vec<String>> {
        let _guard = self.guard();
        Ok(self.index.list_keys()?)
    }
}

impl std::fmt::Debug for ShardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStore")
            .field("root", &self.config.root)
            .field("max_node_files", &self.config.max_node_files)
            .field("hasher", &self.config.hasher)
            .finish()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
