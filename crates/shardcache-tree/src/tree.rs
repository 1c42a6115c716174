use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use shardcache_digest::{is_digest_name, Digest};
use tracing::error;
use walkdir::WalkDir;

use crate::error::{TreeError, TreeResult};

/// A digest-sharded directory tree rooted at a store directory.
///
/// `ShardTree` holds no in-memory state about the tree's shape: every lookup
/// reads the directories it passes through. Callers serialize lookups
/// against [`ShardTree::rebalance`](crate::ShardTree::rebalance) with the
/// lock they hand to it.
#[derive(Clone, Debug)]
pub struct ShardTree {
    root: PathBuf,
    max_node_files: usize,
}

impl ShardTree {
    /// Create a tree over `root`, splitting leaves that exceed `max_node_files`.
    pub fn new(root: impl Into<PathBuf>, max_node_files: usize) -> Self {
        Self {
            root: root.into(),
            max_node_files,
        }
    }

    /// The tree's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split threshold for leaves.
    pub fn max_node_files(&self) -> usize {
        self.max_node_files
    }

    /// Find the leaf directory that owns `digest`.
    ///
    /// At each level the children are sorted by name and the first one that
    /// is `>=` the digest is entered.
    pub fn find_leaf(&self, digest: &Digest) -> TreeResult<PathBuf> {
        let mut node = self.root.clone();
        loop {
            let children = child_nodes(&node)?;
            if children.is_empty() {
                return Ok(node);
            }
            match children
                .into_iter()
                .find(|name| name.as_str() >= digest.as_str())
            {
                Some(name) => node.push(name),
                None => {
                    error!(node = %node.display(), %digest, "no shard boundary covers digest");
                    return Err(TreeError::InconsistentTree {
                        node,
                        digest: digest.clone(),
                    });
                }
            }
        }
    }

    /// Path of the content file for `digest`, whether or not it exists yet.
    pub fn content_path(&self, digest: &Digest) -> TreeResult<PathBuf> {
        let mut path = self.find_leaf(digest)?;
        path.push(digest.as_str());
        Ok(path)
    }

    /// Returns `true` if `node` is a leaf holding more content files than
    /// the split threshold.
    pub fn is_overloaded(&self, node: &Path) -> TreeResult<bool> {
        if !child_nodes(node)?.is_empty() {
            return Ok(false);
        }
        Ok(content_file_names(node)?.len() > self.max_node_files)
    }

    /// Number of leaf directories in the tree.
    pub fn leaf_count(&self) -> TreeResult<usize> {
        fn count(node: &Path) -> TreeResult<usize> {
            let children = child_nodes(node)?;
            if children.is_empty() {
                return Ok(1);
            }
            children.iter().map(|name| count(&node.join(name))).sum()
        }
        count(&self.root)
    }

    /// Every content file anywhere under the root.
    pub fn content_files(&self) -> TreeResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let is_content = entry.file_type().is_file()
                && entry.file_name().to_str().is_some_and(is_digest_name);
            if is_content {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// Names of the sub-directories of `dir`, sorted.
pub(crate) fn child_nodes(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry_is(&entry, |t| t.is_dir())? {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Names of the content files held directly in `dir`, sorted.
///
/// Anything that is not named like a digest (the index, temp files) is
/// ignored.
pub(crate) fn content_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry_is(&entry, |t| t.is_file())? {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_digest_name(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

// Entries can be moved away by a concurrent split between listing and stat.
fn entry_is(entry: &fs::DirEntry, pred: impl Fn(&fs::FileType) -> bool) -> io::Result<bool> {
    match entry.file_type() {
        Ok(t) => Ok(pred(&t)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
