//! Job-scoped scratch directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ARCHIVE_FILE_NAME: &str = "upload.archive";
const CONTENTS_DIR_NAME: &str = "contents";

/// Allocates isolated scratch directories under a common root.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    root: PathBuf,
}

impl ScratchArea {
    /// Create the area, creating `root` if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, uniquely named directory for one upload.
    pub fn allocate(&self) -> io::Result<ScratchDir> {
        let dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.root)?;
        fs::create_dir(dir.path().join(CONTENTS_DIR_NAME))?;
        tracing::debug!(path = %dir.path().display(), "Allocated scratch directory");
        Ok(ScratchDir { dir })
    }
}

/// Owned scratch directory. Dropping it deletes the directory and everything
/// in it, including while unwinding from a panic.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the raw upload is written before expansion.
    pub fn archive_path(&self) -> PathBuf {
        self.dir.path().join(ARCHIVE_FILE_NAME)
    }

    /// Extraction root. Result keys are relative to this directory.
    pub fn contents_dir(&self) -> PathBuf {
        self.dir.path().join(CONTENTS_DIR_NAME)
    }

    /// Remove the directory now, reporting failures instead of swallowing them.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "Removed scratch directory");
        Ok(())
    }
}
