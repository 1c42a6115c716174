use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::boundary::Boundary;
use crate::error::TreeResult;
use crate::tree::{child_nodes, content_file_names, ShardTree};

/// Summary of a rebalance pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebalanceReport {
    /// Leaves split into two children.
    pub splits: usize,
    /// Content files moved into new children.
    pub files_moved: usize,
}

impl ShardTree {
    /// Split every leaf that holds more than `max_node_files` content files.
    ///
    /// The walk and the per-leaf file count run without `lock`; each split
    /// takes it for the duration of the directory creation and file moves,
    /// so no lookup made under the same lock sees a half-moved leaf. A leaf
    /// that is still overloaded after splitting is split again in the same
    /// pass. Running it on a balanced tree changes nothing.
    pub fn rebalance(&self, lock: &Mutex<()>) -> TreeResult<RebalanceReport> {
        let mut report = RebalanceReport::default();
        self.rebalance_node(self.root(), Boundary::MIN, Boundary::MAX, lock, &mut report)?;
        if report.splits > 0 {
            info!(
                splits = report.splits,
                files_moved = report.files_moved,
                "rebalanced shard tree"
            );
        }
        Ok(report)
    }

    /// `node` owns the digests in `(lower, upper]`.
    fn rebalance_node(
        &self,
        node: &Path,
        lower: Boundary,
        upper: Boundary,
        lock: &Mutex<()>,
        report: &mut RebalanceReport,
    ) -> TreeResult<()> {
        if child_nodes(node)?.is_empty() {
            if content_file_names(node)?.len() <= self.max_node_files() {
                return Ok(());
            }
            self.split(node, lower, upper, lock, report)?;
        }

        let mut child_lower = lower;
        for name in child_nodes(node)? {
            let child_upper = Boundary::parse(&name)?;
            self.rebalance_node(&node.join(&name), child_lower, child_upper, lock, report)?;
            child_lower = child_upper;
        }
        Ok(())
    }

    fn split(
        &self,
        node: &Path,
        lower: Boundary,
        upper: Boundary,
        lock: &Mutex<()>,
        report: &mut RebalanceReport,
    ) -> TreeResult<()> {
        let _guard = lock.lock().expect("store lock poisoned");

        // Another pass may have split this leaf since it was probed.
        if !child_nodes(node)?.is_empty() {
            debug!(node = %node.display(), "leaf already split");
            return Ok(());
        }

        let mid = Boundary::midpoint(&lower, &upper);
        if mid == lower || mid == upper {
            warn!(
                node = %node.display(),
                %lower,
                %upper,
                "shard range too narrow to split"
            );
            return Ok(());
        }

        let low_name = mid.to_hex();
        let low_dir = node.join(&low_name);
        let high_dir = node.join(upper.to_hex());
        // The upper child covers the whole range on its own, so lookups made
        // without the lock still reach a leaf while the split is under way.
        fs::create_dir(&high_dir)?;
        fs::create_dir(&low_dir)?;

        let mut moved = 0;
        for name in content_file_names(node)? {
            let target = if name.as_str() <= low_name.as_str() {
                &low_dir
            } else {
                &high_dir
            };
            fs::rename(node.join(&name), target.join(&name))?;
            moved += 1;
        }

        report.splits += 1;
        report.files_moved += moved;
        debug!(node = %node.display(), boundary = %mid, files = moved, "split shard leaf");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardcache_digest::Digest;
    use std::path::PathBuf;

    const MID: &str = "8000000000000000000000000000000000000000";
    const TOP: &str = "ffffffffffffffffffffffffffffffffffffffff";

    /// Write a content file for `key` wherever the tree currently routes it.
    fn put(tree: &ShardTree, key: &str) -> PathBuf {
        let path = tree.content_path(&Digest::of(key)).unwrap();
        fs::write(&path, key.as_bytes()).unwrap();
        path
    }

    fn max_leaf_files(node: &Path) -> usize {
        let children = child_nodes(node).unwrap();
        if children.is_empty() {
            return content_file_names(node).unwrap().len();
        }
        children
            .iter()
            .map(|c| max_leaf_files(&node.join(c)))
            .max()
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Splitting
    // -----------------------------------------------------------------------

    #[test]
    fn balanced_tree_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 2);
        let lock = Mutex::new(());
        put(&tree, "a");
        put(&tree, "b");

        let report = tree.rebalance(&lock).unwrap();
        assert_eq!(report, RebalanceReport::default());
        assert_eq!(tree.leaf_count().unwrap(), 1);
    }

    #[test]
    fn overloaded_root_splits_at_midpoint() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 2);
        let lock = Mutex::new(());
        fs::write(dir.path().join("index"), b"").unwrap();
        for key in ["a", "b", "c"] {
            put(&tree, key);
        }

        let report = tree.rebalance(&lock).unwrap();
        assert_eq!(report.splits, 1);
        assert_eq!(report.files_moved, 3);

        // a (0cc1...) and c (4a8a...) fall at or below 8000..., b (92eb...) above.
        assert!(dir.path().join(MID).join(Digest::of("a").as_str()).is_file());
        assert!(dir.path().join(MID).join(Digest::of("c").as_str()).is_file());
        assert!(dir.path().join(TOP).join(Digest::of("b").as_str()).is_file());
        // The index stays at the root.
        assert!(dir.path().join("index").is_file());
    }

    #[test]
    fn lookups_follow_moved_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 3);
        let lock = Mutex::new(());
        let keys: Vec<String> = (0..40).map(|i| format!("https://example.com/{i}")).collect();
        for key in &keys {
            put(&tree, key);
        }

        let report = tree.rebalance(&lock).unwrap();
        assert!(report.splits > 1);
        assert!(max_leaf_files(dir.path()) <= 3);

        for key in &keys {
            let path = tree.content_path(&Digest::of(key)).unwrap();
            assert_eq!(fs::read(&path).unwrap(), key.as_bytes());
        }
    }

    #[test]
    fn still_overloaded_child_splits_again() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 1);
        let lock = Mutex::new(());
        for key in ["a", "b", "c"] {
            put(&tree, key);
        }

        let report = tree.rebalance(&lock).unwrap();
        // Root split leaves a and c together under 8000..., which splits at 4000...
        assert_eq!(report.splits, 2);
        assert_eq!(tree.leaf_count().unwrap(), 3);
        let low = "4000000000000000000000000000000000000000";
        assert!(dir
            .path()
            .join(MID)
            .join(low)
            .join(Digest::of("a").as_str())
            .is_file());
        assert!(dir
            .path()
            .join(MID)
            .join(MID)
            .join(Digest::of("c").as_str())
            .is_file());
    }

    #[test]
    fn second_pass_after_growth_splits_only_the_full_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 4);
        let lock = Mutex::new(());
        for i in 0..5 {
            put(&tree, &format!("key-{i}"));
        }
        tree.rebalance(&lock).unwrap();
        let leaves = tree.leaf_count().unwrap();

        for i in 5..30 {
            put(&tree, &format!("key-{i}"));
        }
        let report = tree.rebalance(&lock).unwrap();
        assert!(report.splits > 0);
        assert!(tree.leaf_count().unwrap() > leaves);
        assert!(max_leaf_files(dir.path()) <= 4);

        // Idempotent once balanced.
        assert_eq!(tree.rebalance(&lock).unwrap(), RebalanceReport::default());
    }

    #[test]
    fn split_skips_leaf_split_by_someone_else() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 1);
        let lock = Mutex::new(());
        fs::create_dir(dir.path().join(TOP)).unwrap();

        let mut report = RebalanceReport::default();
        tree.split(dir.path(), Boundary::MIN, Boundary::MAX, &lock, &mut report)
            .unwrap();
        assert_eq!(report, RebalanceReport::default());
        assert!(!dir.path().join(MID).exists());
    }

    #[test]
    fn lookups_reach_upper_child_before_lower_exists() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 1);
        fs::create_dir(dir.path().join(TOP)).unwrap();

        // b (92eb...) sorts above the midpoint, a (0cc1...) below it.
        for key in ["a", "b"] {
            let leaf = tree.find_leaf(&Digest::of(key)).unwrap();
            assert_eq!(leaf, dir.path().join(TOP));
        }
    }

    #[test]
    fn split_creates_both_children() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ShardTree::new(dir.path(), 1);
        let lock = Mutex::new(());
        put(&tree, "b");

        let mut report = RebalanceReport::default();
        tree.split(dir.path(), Boundary::MIN, Boundary::MAX, &lock, &mut report)
            .unwrap();
        assert_eq!(child_nodes(dir.path()).unwrap(), vec![MID, TOP]);
        assert_eq!(tree.find_leaf(&Digest::of("b")).unwrap(), dir.path().join(TOP));
        assert!(dir.path().join(TOP).join(Digest::of("b").as_str()).is_file());
    }

    #[test]
    fn non_boundary_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("not-a-boundary")).unwrap();
        let tree = ShardTree::new(dir.path(), 1);
        let lock = Mutex::new(());

        let err = tree.rebalance(&lock).unwrap_err();
        assert!(matches!(err, crate::TreeError::InvalidBoundary { .. }));
    }
}
