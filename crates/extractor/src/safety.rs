//! Containment checks for archive entries.
//!
//! Uploaded archives are untrusted. Every entry path goes through
//! [`validate_entry_path`] before anything touches the disk, and every write
//! target is re-checked with [`resolve_within`] so that an entry can never land
//! outside the job's scratch directory (zip-slip).

use crate::error::{ExtractError, SecurityError};
use std::path::{Component, Path, PathBuf};

/// Entry type for filtering special file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Hard link
    Hardlink,
    /// Other special file types (device, fifo, etc.)
    Other,
}

/// Normalizes an archive entry path into a safe relative path.
///
/// Rejects absolute paths, drive prefixes, `..` components and paths that
/// normalize to nothing. `.` components and doubled separators are dropped.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use extractor::safety::validate_entry_path;
///
/// let safe = validate_entry_path(Path::new("./src/Main.java")).unwrap();
/// assert_eq!(safe, Path::new("src/Main.java"));
///
/// assert!(validate_entry_path(Path::new("../../etc/passwd")).is_err());
/// assert!(validate_entry_path(Path::new("/etc/passwd")).is_err());
/// ```
pub fn validate_entry_path(path: &Path) -> Result<PathBuf, SecurityError> {
    let display = path.display().to_string();

    if path.is_absolute() {
        return Err(SecurityError::AbsolutePath(display));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                // Windows-style separators inside a single component would be
                // reinterpreted on other hosts.
                let part_str = part.to_str().ok_or_else(|| {
                    SecurityError::PathTraversal(format!("non UTF-8 component in {display}"))
                })?;
                if part_str.split('\\').any(|piece| piece == "..") {
                    return Err(SecurityError::PathTraversal(display));
                }
                normalized.push(part);
            }
            Component::CurDir => continue,
            Component::ParentDir => return Err(SecurityError::PathTraversal(display)),
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::AbsolutePath(display))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(format!(
            "{display} normalizes to an empty path"
        )));
    }

    Ok(normalized)
}

/// Joins a validated relative path onto `root` and confirms the result stays
/// inside `root` once symlinks already on disk are resolved.
///
/// `root` must exist. The target itself may not exist yet; its nearest existing
/// ancestor is canonicalized instead.
pub fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, SecurityError> {
    let target = root.join(relative);
    let canonical_root = root
        .canonicalize()
        .map_err(|e| SecurityError::PathTraversal(format!("{}: {e}", root.display())))?;

    let mut ancestor = target.as_path();
    let anchor = loop {
        match ancestor.canonicalize() {
            Ok(resolved) => break resolved,
            Err(_) => match ancestor.parent() {
                Some(parent) => ancestor = parent,
                None => {
                    return Err(SecurityError::PathTraversal(
                        relative.display().to_string(),
                    ))
                }
            },
        }
    };

    if !anchor.starts_with(&canonical_root) {
        return Err(SecurityError::PathTraversal(relative.display().to_string()));
    }

    Ok(target)
}

/// Fails once `current_bytes` passes the configured limit (`None` = unlimited).
///
/// ```
/// use extractor::safety::check_size_limits;
///
/// assert!(check_size_limits(1000, Some(1000)).is_ok());
/// assert!(check_size_limits(1001, Some(1000)).is_err());
/// assert!(check_size_limits(u64::MAX, None).is_ok());
/// ```
pub fn check_size_limits(current_bytes: u64, limit: Option<u64>) -> Result<(), ExtractError> {
    match limit {
        Some(limit) if current_bytes > limit => Err(ExtractError::SizeLimitExceeded {
            current: current_bytes,
            limit,
        }),
        _ => Ok(()),
    }
}

/// Whether an entry of this type may be written to scratch storage.
///
/// Only plain files and directories are materialized. Links could point the
/// analyzer at files outside the scratch directory.
pub fn is_safe_entry_type(entry_type: EntryType) -> bool {
    matches!(entry_type, EntryType::File | EntryType::Directory)
}
