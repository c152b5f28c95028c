//! Archive materialization: sniff, expand with containment checks, discover.

use crate::error::{ExtractError, SecurityError};
use crate::safety::{
    check_size_limits, is_safe_entry_type, resolve_within, validate_entry_path, EntryType,
};
use crate::types::{ArchiveFormat, MaterializeOptions, MaterializedArchive};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Bytes inspected when sniffing the container format. Tar keeps its magic at
/// offset 257, so this has to cover a full header block.
const SNIFF_LEN: u64 = 512;

const COPY_BUF_LEN: usize = 64 * 1024;

#[derive(Debug, Default)]
struct ExtractStats {
    entries_extracted: u64,
    bytes_written: u64,
    skipped_entries: u64,
}

/// Expand the archive at `archive_path` into `dest` and list the analyzable files.
///
/// The format is taken from the archive's leading bytes, never from a
/// client-supplied name. Unsafe entries (traversal, absolute paths, links,
/// special files) are skipped rather than failing the whole upload. Returned
/// paths are absolute (rooted at `dest`), sorted by a file-name-ordered walk so
/// that repeated runs over the same archive see the same order.
///
/// # Errors
///
/// - [`ExtractError::InvalidArchive`] if the bytes are not a supported archive
///   or an entry cannot be decoded
/// - [`ExtractError::SizeLimitExceeded`] if expansion passes
///   `options.size_limit_bytes`
/// - [`ExtractError::NoMatchingFiles`] if nothing matches `options.extensions`
/// - [`ExtractError::Io`] for scratch-storage failures
pub fn materialize_archive(
    archive_path: &Path,
    dest: &Path,
    options: &MaterializeOptions,
) -> Result<MaterializedArchive, ExtractError> {
    let start_time = Instant::now();

    let mut archive_file = File::open(archive_path)?;
    let format = sniff_format(&mut archive_file)?;

    fs::create_dir_all(dest)?;

    let mut stats = ExtractStats::default();
    match format {
        ArchiveFormat::Zip => extract_zip(archive_file, dest, options, &mut stats)?,
        ArchiveFormat::Tar => {
            extract_tar(BufReader::new(archive_file), dest, options, &mut stats)?
        }
        ArchiveFormat::TarGz => extract_tar(
            GzDecoder::new(BufReader::new(archive_file)),
            dest,
            options,
            &mut stats,
        )?,
    }

    let files = discover_files(dest, options)?;

    tracing::info!(
        format = %format,
        entries = stats.entries_extracted,
        bytes = stats.bytes_written,
        skipped = stats.skipped_entries,
        matching = files.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Materialized archive"
    );

    if files.is_empty() {
        return Err(ExtractError::NoMatchingFiles);
    }

    Ok(MaterializedArchive {
        format,
        files,
        entries_extracted: stats.entries_extracted,
        bytes_written: stats.bytes_written,
        skipped_entries: stats.skipped_entries,
    })
}

/// Identify the container format from its leading bytes.
///
/// ```
/// use extractor::{detect_format, ArchiveFormat};
///
/// assert_eq!(detect_format(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
/// assert_eq!(detect_format(&[0x1f, 0x8b, 0x08]), Some(ArchiveFormat::TarGz));
/// assert_eq!(detect_format(b"just text"), None);
/// ```
pub fn detect_format(header: &[u8]) -> Option<ArchiveFormat> {
    const ZIP_MAGICS: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

    if ZIP_MAGICS.iter().any(|magic| header.starts_with(magic)) {
        return Some(ArchiveFormat::Zip);
    }
    if header.starts_with(&[0x1f, 0x8b]) {
        return Some(ArchiveFormat::TarGz);
    }
    if header.get(257..262) == Some(b"ustar".as_slice()) {
        return Some(ArchiveFormat::Tar);
    }
    None
}

fn sniff_format<R: Read + Seek>(reader: &mut R) -> Result<ArchiveFormat, ExtractError> {
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    reader.by_ref().take(SNIFF_LEN).read_to_end(&mut header)?;
    reader.seek(SeekFrom::Start(0))?;

    detect_format(&header)
        .ok_or_else(|| ExtractError::InvalidArchive("unrecognized archive format".to_string()))
}

fn extract_zip(
    archive_file: File,
    dest: &Path,
    options: &MaterializeOptions,
    stats: &mut ExtractStats,
) -> Result<(), ExtractError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(archive_file))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_name = entry.name().to_string();

        let entry_type = if entry.is_dir() {
            EntryType::Directory
        } else {
            zip_entry_type(entry.unix_mode())
        };

        let Some(target) = admit_entry(&entry_name, entry_type, dest, stats) else {
            continue;
        };

        if entry_type == EntryType::Directory {
            fs::create_dir_all(&target).map_err(placement_error)?;
            continue;
        }

        write_entry(&mut entry, &target, options, stats)?;
    }

    Ok(())
}

fn extract_tar<R: Read>(
    reader: R,
    dest: &Path,
    options: &MaterializeOptions,
    stats: &mut ExtractStats,
) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(invalid_archive)?;

    for entry in entries {
        let mut entry = entry.map_err(invalid_archive)?;
        let header_type = entry.header().entry_type();

        let entry_type = match header_type {
            tar::EntryType::XGlobalHeader => continue,
            t if t.is_dir() => EntryType::Directory,
            t if t.is_file() || t == tar::EntryType::Continuous => EntryType::File,
            t if t.is_symlink() => EntryType::Symlink,
            t if t.is_hard_link() => EntryType::Hardlink,
            _ => EntryType::Other,
        };

        let entry_name = entry
            .path()
            .map_err(invalid_archive)?
            .to_string_lossy()
            .into_owned();

        let Some(target) = admit_entry(&entry_name, entry_type, dest, stats) else {
            continue;
        };

        if entry_type == EntryType::Directory {
            fs::create_dir_all(&target).map_err(placement_error)?;
            continue;
        }

        write_entry(&mut entry, &target, options, stats)?;
    }

    Ok(())
}

/// Run the safety checks for one entry. Returns the write target, or `None`
/// (after logging and counting) when the entry is skipped.
fn admit_entry(
    entry_name: &str,
    entry_type: EntryType,
    dest: &Path,
    stats: &mut ExtractStats,
) -> Option<PathBuf> {
    let checked = if is_safe_entry_type(entry_type) {
        validate_entry_path(Path::new(entry_name))
            .and_then(|relative| resolve_within(dest, &relative))
    } else {
        Err(SecurityError::UnsafeEntryType(format!(
            "{entry_name} ({entry_type:?})"
        )))
    };

    match checked {
        Ok(target) => Some(target),
        Err(error) => {
            tracing::warn!(entry = %entry_name, error = %error, "Skipping unsafe archive entry");
            stats.skipped_entries += 1;
            None
        }
    }
}

/// Copy one entry to disk. Every chunk counts against the size limit before it
/// is written; declared entry sizes are never trusted.
fn write_entry<R: Read>(
    reader: &mut R,
    target: &Path,
    options: &MaterializeOptions,
    stats: &mut ExtractStats,
) -> Result<(), ExtractError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(placement_error)?;
    }
    let mut output = File::create(target).map_err(placement_error)?;
    let mut buf = vec![0u8; COPY_BUF_LEN];

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(invalid_archive(e)),
        };

        let new_total = stats.bytes_written + read as u64;
        check_size_limits(new_total, options.size_limit_bytes)?;

        output.write_all(&buf[..read])?;
        stats.bytes_written = new_total;
    }

    stats.entries_extracted += 1;
    Ok(())
}

/// Walk the extraction root and collect matching regular files in a stable order.
fn discover_files(root: &Path, options: &MaterializeOptions) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| options.matches(name));
        if matches {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn zip_entry_type(unix_mode: Option<u32>) -> EntryType {
    const S_IFMT: u32 = 0o170_000;
    const S_IFREG: u32 = 0o100_000;
    const S_IFLNK: u32 = 0o120_000;

    match unix_mode.map(|mode| mode & S_IFMT) {
        // DOS-made archives carry no file type bits at all
        None | Some(0) | Some(S_IFREG) => EntryType::File,
        Some(S_IFLNK) => EntryType::Symlink,
        Some(_) => EntryType::Other,
    }
}

/// A path under the extraction root could not be created. Entries that clash
/// with each other (a file where a directory must go, or the reverse) leave the
/// archive unexpandable; any other failure belongs to scratch storage.
fn placement_error(err: io::Error) -> ExtractError {
    match err.kind() {
        io::ErrorKind::AlreadyExists
        | io::ErrorKind::NotADirectory
        | io::ErrorKind::IsADirectory => {
            ExtractError::InvalidArchive(format!("conflicting archive entries: {err}"))
        }
        _ => ExtractError::Io(err),
    }
}

fn invalid_archive(err: io::Error) -> ExtractError {
    ExtractError::InvalidArchive(err.to_string())
}
