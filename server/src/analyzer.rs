//! Per-file analysis.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("read failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not valid UTF-8 (first bad byte at offset {offset})")]
    InvalidUtf8 { path: PathBuf, offset: usize },
}

/// Maps one file to a scalar metric.
///
/// Called once per file, one file at a time per job, on a blocking thread.
/// Implementations may be slow and may fail.
pub trait FileAnalyzer: Send + Sync + 'static {
    fn analyze(&self, path: &Path) -> Result<u64, AnalyzeError>;
}

/// Counts text lines in a UTF-8 file.
///
/// `\n`, `\r\n` and a lone `\r` each end a line, and a final line without a
/// terminator still counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCounter;

impl FileAnalyzer for LineCounter {
    fn analyze(&self, path: &Path) -> Result<u64, AnalyzeError> {
        let bytes = std::fs::read(path).map_err(|source| AnalyzeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = std::str::from_utf8(&bytes).map_err(|e| AnalyzeError::InvalidUtf8 {
            path: path.to_path_buf(),
            offset: e.valid_up_to(),
        })?;
        Ok(count_lines(text))
    }
}

pub fn count_lines(text: &str) -> u64 {
    let bytes = text.as_bytes();
    let mut lines = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => lines += 1,
            b'\r' => {
                lines += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if !text.is_empty() && !text.ends_with(&['\n', '\r'][..]) {
        lines += 1;
    }
    lines
}
