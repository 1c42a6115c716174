//! Key digests for the shard cache.
//!
//! Every cached value is addressed by a [`Digest`]: a 32-character lowercase
//! hex fingerprint of its key. The digest doubles as the content file name on
//! disk and as the value the shard tree routes on.
//!
//! # Key Types
//!
//! - [`Digest`] -- validated 128-bit hex address
//! - [`KeyHasher`] -- the hash function that turns a key into a digest

pub mod digest;
pub mod error;
pub mod hasher;

pub use digest::{is_digest_name, Digest, DIGEST_HEX_LEN};
pub use error::DigestError;
pub use hasher::KeyHasher;
