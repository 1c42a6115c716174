//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A line does not follow `<YYYYMMDD> <digest>: "<key>"`.
    #[error("malformed index line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// I/O error reading or writing the index file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
