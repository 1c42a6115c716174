use thiserror::Error;

/// Errors produced when parsing a digest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("digest is not lowercase hex: {0:?}")]
    InvalidHex(String),
}
