//! Key index for the shard cache.
//!
//! Digests cannot be reversed, so the store keeps a single text file at
//! `<root>/index` recording, for every live key, the date it was first
//! stored, its digest and the key itself:
//!
//! ```text
//! 20261018 0cc175b9c0f1b6a831c399e269772661: "a"
//! ```
//!
//! Lines are appended on first insert and dropped by a full rewrite on
//! removal. The index is what makes key enumeration and age-based expiry
//! possible without walking the shard tree.
//!
//! # Known limitation
//!
//! Lines are split on single spaces into exactly three fields, so a key
//! containing a space produces a line that [`IndexLog::scan`] rejects with
//! [`IndexError::MalformedLine`]. Keys are written verbatim, so a key
//! containing a newline breaks its line in two; every later scan then fails,
//! which also breaks key listing and, when an expiry policy is configured,
//! opening the store. The format is kept as-is for compatibility with
//! existing stores.

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{IndexEntry, DATE_FORMAT};
pub use error::{IndexError, IndexResult};
pub use log::{IndexLog, INDEX_FILE_NAME};
