//! Error types for reader configuration and read initiation.

use thiserror::Error;

/// Primary error type for batch read operations.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A content-type pattern failed to compile.
    #[error("invalid content-type pattern")]
    InvalidPattern {
        /// Pattern supplied by the caller.
        pattern: String,
        /// Compiler diagnostic.
        #[source]
        source: regex::Error,
    },
    /// A read-mode name was not recognised.
    #[error("invalid read mode")]
    InvalidReadMode {
        /// Read-mode payload provided by the caller.
        value: String,
    },
    /// The host read primitive refused to start a read.
    #[error("failed to start read")]
    ReadStart {
        /// Name of the file whose read could not begin.
        file: String,
        /// Backend-provided detail.
        detail: String,
    },
}

impl ReadError {
    /// Construct a read-start failure for the named file.
    #[must_use]
    pub fn read_start(file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ReadStart {
            file: file.into(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias for batch read results.
pub type ReadResult<T> = Result<T, ReadError>;
