use std::borrow::Borrow;
use std::fmt;

use crate::error::DigestError;
use crate::hasher::KeyHasher;

/// Length of a digest in hex characters (128-bit hash).
pub const DIGEST_HEX_LEN: usize = 32;

/// Content address of a cache key.
///
/// A `Digest` is always exactly [`DIGEST_HEX_LEN`] lowercase hex characters.
/// Ordering is plain string ordering, which is what the shard tree compares
/// against its boundary names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Digest of `key` with the default (MD5) hasher.
    pub fn of(key: &str) -> Self {
        KeyHasher::default().digest(key)
    }

    /// Build a digest from 16 raw hash bytes.
    pub fn from_raw(bytes: [u8; 16]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a digest from its hex form, e.g. a content file name.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                actual: s.len(),
            });
        }
        if !is_lower_hex(s) {
            return Err(DigestError::InvalidHex(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        &self.0[..8]
    }
}

/// Returns `true` if `name` looks like a content file name.
pub fn is_digest_name(name: &str) -> bool {
    name.len() == DIGEST_HEX_LEN && is_lower_hex(name)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets `HashSet<Digest>` be queried with a `&str` token from the index file.
impl Borrow<str> for Digest {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Digest {
    type Error = DigestError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}
