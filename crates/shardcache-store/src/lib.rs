//! Persistent, content-addressed key-value cache.
//!
//! Values of any size are stored as files named by the digest of their key,
//! inside a directory tree that splits itself as it fills up. A single index
//! file remembers every live key and the date it was stored, which is what
//! lets the store list its keys and expire old entries.
//!
//! # Usage
//!
//! ```no_run
//! use shardcache_store::{CacheStore, ExpiryPolicy, ShardStore, StoreConfig};
//!
//! # fn main() -> shardcache_store::StoreResult<()> {
//! let config = StoreConfig::new("/var/cache/pages").with_expiry(ExpiryPolicy::days(30));
//! let store = ShardStore::open(config)?;
//!
//! store.add("https://example.com/", b"<html>...</html>")?;
//! assert!(store.has_key("https://example.com/")?);
//! let page = store.retrieve("https://example.com/")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Rules
//!
//! 1. One lock per store handle serializes every read, write and file move.
//! 2. `has_key` and the rebalance leaf probe run without the lock; they may
//!    see a stale tree and the result is only advisory.
//! 3. An index line exists for a key exactly when its content file does.
//! 4. The store is safe across threads of one process only. Two processes
//!    sharing a root are not coordinated.
//! 5. I/O errors are propagated and nothing is rolled back.

pub mod config;
pub mod error;
pub mod expiry;
pub mod store;
pub mod traits;

pub use config::{StoreConfig, DEFAULT_MAX_NODE_FILES, DEFAULT_REBALANCE_EVERY_BYTES};
pub use error::{StoreError, StoreResult};
pub use expiry::{ExpiryPolicy, ExpiryUnit};
pub use store::{ShardStore, StoreStats};
pub use traits::CacheStore;

pub use shardcache_digest::{Digest, KeyHasher};
pub use shardcache_index::IndexEntry;
pub use shardcache_tree::RebalanceReport;
