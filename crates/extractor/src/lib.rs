//! # Extractor
//!
//! Scratch storage and hardened archive materialization for linecount.
//!
//! An upload is written into a job-scoped [`ScratchDir`], expanded into its
//! `contents` directory with path-traversal containment and a size limit, and
//! the files matching the configured extensions are returned in a stable
//! discovery order.
//!
//! ## Supported Formats
//!
//! - ZIP
//! - TAR (plain or gzip-compressed)
//!
//! ## Example
//!
//! ```rust,no_run
//! use extractor::{materialize, MaterializeOptions, ScratchArea};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let area = ScratchArea::new("/tmp/linecount")?;
//! let scratch = area.allocate()?;
//! std::fs::copy("project.zip", scratch.archive_path())?;
//!
//! let archive = materialize(
//!     &scratch.archive_path(),
//!     &scratch.contents_dir(),
//!     &MaterializeOptions::default(),
//! )?;
//! println!("{} files ready for analysis", archive.files.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod safety;
pub mod scratch;
pub mod types;

// Re-export main types
pub use error::{ExtractError, SecurityError};
pub use extract::detect_format;
pub use safety::EntryType;
pub use scratch::{ScratchArea, ScratchDir};
pub use types::{ArchiveFormat, MaterializeOptions, MaterializedArchive};

use std::path::Path;

/// Expand an uploaded archive into `dest` and list the files worth analyzing.
///
/// This is blocking I/O; async callers should run it on a blocking thread.
///
/// # Errors
///
/// Returns an error if:
/// - The upload is not a readable ZIP/TAR archive
/// - Expansion exceeds the configured size limit
/// - No extracted file matches the configured extensions
/// - Scratch storage cannot be written
pub fn materialize(
    archive_path: &Path,
    dest: &Path,
    options: &MaterializeOptions,
) -> Result<MaterializedArchive, ExtractError> {
    extract::materialize_archive(archive_path, dest, options)
}
