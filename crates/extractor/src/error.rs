//! Error types for scratch allocation and archive materialization.

use thiserror::Error;

/// Main error type for materialization operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The upload could not be expanded as a supported archive.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// The archive expanded fine but contained no file with a recognized extension.
    #[error("No matching files in archive")]
    NoMatchingFiles,

    /// The extraction size limit was exceeded.
    #[error("Size limit exceeded: {current} bytes > {limit} bytes")]
    SizeLimitExceeded {
        /// Extracted size in bytes when the limit tripped
        current: u64,
        /// Configured size limit in bytes
        limit: u64,
    },

    /// An I/O error occurred while writing to scratch storage.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            // Short or garbled input surfaces as an I/O error from the reader
            zip::result::ZipError::Io(io_err)
                if matches!(
                    io_err.kind(),
                    std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
                ) =>
            {
                ExtractError::InvalidArchive(io_err.to_string())
            }
            zip::result::ZipError::Io(io_err) => ExtractError::Io(io_err),
            other => ExtractError::InvalidArchive(other.to_string()),
        }
    }
}

/// Security-related rejections of individual archive entries.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),

    /// Unsafe entry type detected (e.g., symlink when not allowed).
    #[error("Unsafe entry type: {0}")]
    UnsafeEntryType(String),
}
