use std::fmt;

use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Hash function used to address keys.
///
/// Both variants produce 128-bit digests, so the on-disk layout is the same
/// whichever is chosen. A store root must only ever be used with one hasher:
/// mixing them is not detected and makes existing entries unreachable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHasher {
    /// MD5 of the key's UTF-8 bytes. Compatible with existing stores.
    #[default]
    Md5,
    /// BLAKE3 of the key's UTF-8 bytes, truncated to 128 bits.
    Blake3,
}

impl KeyHasher {
    /// Compute the digest of a key.
    pub fn digest(&self, key: &str) -> Digest {
        let mut raw = [0u8; 16];
        match self {
            Self::Md5 => raw.copy_from_slice(&Md5::digest(key.as_bytes())),
            Self::Blake3 => raw.copy_from_slice(&blake3::hash(key.as_bytes()).as_bytes()[..16]),
        }
        Digest::from_raw(raw)
    }

    /// Lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for KeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
