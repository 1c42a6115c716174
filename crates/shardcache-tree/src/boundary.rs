use std::fmt;

use crate::error::{TreeError, TreeResult};

/// Length of a boundary name in hex characters (160 bits).
///
/// Boundaries are wider than the 32-character digests they route. Names are
/// compared as strings, so a digest sorts before any boundary that starts
/// with the same 32 characters.
pub const BOUNDARY_HEX_LEN: usize = 40;

const BOUNDARY_BYTES: usize = BOUNDARY_HEX_LEN / 2;

/// Inclusive upper bound of the digest range owned by a shard directory.
///
/// Stored as a big-endian 160-bit integer, so the derived ordering agrees
/// with the ordering of the lowercase hex names on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Boundary([u8; BOUNDARY_BYTES]);

impl Boundary {
    /// Lower sentinel: every range starts above it.
    pub const MIN: Self = Self([0x00; BOUNDARY_BYTES]);
    /// Upper sentinel: the last child at every level is named by it or by
    /// its parent's bound, so every digest has a covering child.
    pub const MAX: Self = Self([0xff; BOUNDARY_BYTES]);

    /// Parse a directory name.
    pub fn parse(name: &str) -> TreeResult<Self> {
        let invalid = |reason: String| TreeError::InvalidBoundary {
            name: name.to_string(),
            reason,
        };
        if name.len() != BOUNDARY_HEX_LEN {
            return Err(invalid(format!(
                "expected {BOUNDARY_HEX_LEN} hex characters, got {}",
                name.len()
            )));
        }
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid("uppercase hex".into()));
        }
        let bytes = hex::decode(name).map_err(|e| invalid(e.to_string()))?;
        let mut arr = [0u8; BOUNDARY_BYTES];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Directory name for this boundary.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Split point between `lower` and `upper`: `upper - (upper - lower) / 2`.
    ///
    /// `lower` must not exceed `upper`. The result lies in `[lower, upper]`
    /// and equals `upper` once the two are adjacent.
    pub fn midpoint(lower: &Self, upper: &Self) -> Self {
        debug_assert!(lower <= upper);
        let gap = upper.sub(lower);
        upper.sub(&gap.half())
    }

    fn sub(&self, rhs: &Self) -> Self {
        let mut out = [0u8; BOUNDARY_BYTES];
        let mut borrow = 0i16;
        for i in (0..BOUNDARY_BYTES).rev() {
            let mut v = self.0[i] as i16 - rhs.0[i] as i16 - borrow;
            borrow = if v < 0 {
                v += 256;
                1
            } else {
                0
            };
            out[i] = v as u8;
        }
        Self(out)
    }

    fn half(&self) -> Self {
        let mut out = [0u8; BOUNDARY_BYTES];
        let mut carry = 0u8;
        for (out_byte, &byte) in out.iter_mut().zip(self.0.iter()) {
            *out_byte = (byte >> 1) | (carry << 7);
            carry = byte & 1;
        }
        Self(out)
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boundary({})", self.to_hex())
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
