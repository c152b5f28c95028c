//! Type definitions for archive materialization.

use std::fmt;
use std::path::PathBuf;

/// Archive container formats recognized by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP (including empty and spanned-marker variants)
    Zip,
    /// Uncompressed POSIX/GNU tar
    Tar,
    /// Gzip-compressed tar
    TarGz,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "ZIP"),
            ArchiveFormat::Tar => write!(f, "TAR"),
            ArchiveFormat::TarGz => write!(f, "TAR.GZ"),
        }
    }
}

/// Options for materializing an uploaded archive.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// File extensions (without the leading dot) that count as analyzable
    pub extensions: Vec<String>,

    /// Maximum total extracted size in bytes (default: 1 GiB)
    pub size_limit_bytes: Option<u64>,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["java".to_string()],
            size_limit_bytes: Some(1024 * 1024 * 1024), // 1 GiB
        }
    }
}

impl MaterializeOptions {
    /// Whether `file_name` ends with one of the recognized extensions.
    ///
    /// Matching is case-sensitive, so `Foo.JAVA` is not a `java` file.
    pub fn matches(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            file_name
                .strip_suffix(ext.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }
}

/// Outcome of a successful materialization.
#[derive(Debug, Clone)]
pub struct MaterializedArchive {
    /// Detected container format
    pub format: ArchiveFormat,

    /// Matching files in discovery order (sorted walk of the extraction root)
    pub files: Vec<PathBuf>,

    /// Number of regular files written to disk
    pub entries_extracted: u64,

    /// Total bytes written to disk
    pub bytes_written: u64,

    /// Entries refused by the safety checks
    pub skipped_entries: u64,
}
