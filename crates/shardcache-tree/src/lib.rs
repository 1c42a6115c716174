//! Digest-sharded directory tree for the shard cache.
//!
//! Content files live in *leaf* directories. An *internal* directory holds
//! exactly two children named by 40-hex-character [`Boundary`] values; each
//! child owns the digests up to and including its name. Lookups pick the
//! first child whose name sorts at or after the digest and descend until they
//! reach a leaf.
//!
//! Leaves are never split on the write path. [`ShardTree::rebalance`] walks
//! the whole tree and splits every leaf holding more than the configured
//! number of content files, moving files under the caller's lock.
//!
//! # Layout
//!
//! ```text
//! <root>/index
//! <root>/8000000000000000000000000000000000000000/0cc175b9c0f1b6a831c399e269772661
//! <root>/ffffffffffffffffffffffffffffffffffffffff/92eb5ffee6ae2fec3ad71c777531578f
//! ```

pub mod boundary;
pub mod error;
pub mod rebalance;
pub mod tree;

pub use boundary::{Boundary, BOUNDARY_HEX_LEN};
pub use error::{TreeError, TreeResult};
pub use rebalance::RebalanceReport;
pub use tree::ShardTree;
