use extractor::{materialize, ArchiveFormat, ExtractError, MaterializeOptions};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a ZIP archive from (name, content) pairs
fn create_zip(path: &Path, files: &[(&str, &[u8])]) -> std::io::Result<()> {
    use zip::write::{SimpleFileOptions, ZipWriter};

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);

    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(content)?;
    }

    zip.finish()?;
    Ok(())
}

/// Helper to create a TAR.GZ archive from (name, content) pairs
fn create_tar_gz(path: &Path, files: &[(&str, &[u8])]) -> std::io::Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, &content[..])?;
    }

    tar.into_inner()?.finish()?;
    Ok(())
}

/// Build a plain TAR whose single entry name bypasses the builder's own path checks.
fn create_raw_tar(path: &Path, name: &str, content: &[u8]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut tar = tar::Builder::new(file);

    let mut header = tar::Header::new_ustar();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    tar.append(&header, content)?;

    tar.finish()?;
    Ok(())
}

struct Fixture {
    _temp_dir: TempDir,
    archive_path: PathBuf,
    output_dir: PathBuf,
}

fn fixture(name: &str) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let archive_path = temp_dir.path().join(name);
    let output_dir = temp_dir.path().join("contents");
    Fixture {
        _temp_dir: temp_dir,
        archive_path,
        output_dir,
    }
}

fn relative_names(files: &[PathBuf], root: &Path) -> Vec<String> {
    files
        .iter()
        .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_materialize_zip_discovers_java_files_in_order() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[
            ("src/b/Zeta.java", b"class Zeta {}\n"),
            ("README.md", b"# readme\n"),
            ("src/a/Alpha.java", b"class Alpha {}\n"),
            ("Main.java", b"class Main {}\n"),
        ],
    )
    .unwrap();

    let archive = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default())
        .unwrap();

    assert_eq!(archive.format, ArchiveFormat::Zip);
    assert_eq!(archive.entries_extracted, 4);
    assert_eq!(archive.skipped_entries, 0);
    assert_eq!(
        relative_names(&archive.files, &fx.output_dir),
        vec!["Main.java", "src/a/Alpha.java", "src/b/Zeta.java"]
    );
    assert!(fx.output_dir.join("README.md").exists());
}

#[test]
fn test_materialize_tar_gz() {
    let fx = fixture("upload.archive");
    create_tar_gz(
        &fx.archive_path,
        &[
            ("pkg/One.java", b"a\nb\n"),
            ("pkg/Two.java", b"c\n"),
        ],
    )
    .unwrap();

    let archive = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default())
        .unwrap();

    assert_eq!(archive.format, ArchiveFormat::TarGz);
    assert_eq!(
        relative_names(&archive.files, &fx.output_dir),
        vec!["pkg/One.java", "pkg/Two.java"]
    );
    let content = fs::read_to_string(fx.output_dir.join("pkg/One.java")).unwrap();
    assert_eq!(content, "a\nb\n");
}

#[test]
fn test_materialize_rejects_non_archive() {
    let fx = fixture("upload.archive");
    fs::write(&fx.archive_path, b"public class NotAnArchive {}").unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(matches!(result, Err(ExtractError::InvalidArchive(_))));
}

#[test]
fn test_materialize_rejects_empty_upload() {
    let fx = fixture("upload.archive");
    fs::write(&fx.archive_path, b"").unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(matches!(result, Err(ExtractError::InvalidArchive(_))));
}

#[test]
fn test_materialize_rejects_truncated_zip() {
    let fx = fixture("upload.archive");
    create_zip(&fx.archive_path, &[("Main.java", b"class Main {}\n")]).unwrap();
    let bytes = fs::read(&fx.archive_path).unwrap();
    fs::write(&fx.archive_path, &bytes[..bytes.len() / 2]).unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(matches!(result, Err(ExtractError::InvalidArchive(_))));
}

#[test]
fn test_materialize_no_matching_files() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[("notes.txt", b"hello"), ("Main.kt", b"fun main() {}")],
    )
    .unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(matches!(result, Err(ExtractError::NoMatchingFiles)));
}

#[test]
fn test_materialize_custom_extensions() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[("Main.kt", b"fun main() {}"), ("Main.java", b"class Main {}")],
    )
    .unwrap();

    let options = MaterializeOptions {
        extensions: vec!["kt".to_string()],
        ..MaterializeOptions::default()
    };
    let archive = materialize(&fx.archive_path, &fx.output_dir, &options).unwrap();

    assert_eq!(relative_names(&archive.files, &fx.output_dir), vec!["Main.kt"]);
}

#[test]
fn test_materialize_skips_zip_slip_entries() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[
            ("../../Escape.java", b"class Escape {}"),
            ("/abs/Absolute.java", b"class Absolute {}"),
            ("ok/Safe.java", b"class Safe {}"),
        ],
    )
    .unwrap();

    let archive = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default())
        .unwrap();

    assert_eq!(archive.skipped_entries, 2);
    assert_eq!(relative_names(&archive.files, &fx.output_dir), vec!["ok/Safe.java"]);

    // Nothing landed next to or above the extraction root
    let parent = fx.output_dir.parent().unwrap();
    assert!(!parent.join("Escape.java").exists());
    assert!(!parent.parent().unwrap().join("Escape.java").exists());
}

#[test]
fn test_materialize_skips_tar_traversal_entry() {
    let fx = fixture("upload.archive");
    create_raw_tar(&fx.archive_path, "../Escape.java", b"class Escape {}").unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    // The only entry was refused, so nothing is left to analyze
    assert!(matches!(result, Err(ExtractError::NoMatchingFiles)));
    assert!(!fx.output_dir.parent().unwrap().join("Escape.java").exists());
}

#[cfg(unix)]
#[test]
fn test_materialize_skips_zip_symlinks() {
    use zip::write::{SimpleFileOptions, ZipWriter};

    let fx = fixture("upload.archive");
    {
        let file = File::create(&fx.archive_path).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.add_symlink("Passwd.java", "/etc/passwd", SimpleFileOptions::default())
            .unwrap();
        zip.start_file("Real.java", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"class Real {}\n").unwrap();
        zip.finish().unwrap();
    }

    let archive = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default())
        .unwrap();

    assert_eq!(archive.skipped_entries, 1);
    assert_eq!(relative_names(&archive.files, &fx.output_dir), vec!["Real.java"]);
    assert!(!fx.output_dir.join("Passwd.java").exists());
}

#[test]
fn test_materialize_size_limit() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[("Big.java", &[b'x'; 4096]), ("Small.java", b"class S {}")],
    )
    .unwrap();

    let options = MaterializeOptions {
        size_limit_bytes: Some(1024),
        ..MaterializeOptions::default()
    };
    let result = materialize(&fx.archive_path, &fx.output_dir, &options);

    match result {
        Err(ExtractError::SizeLimitExceeded { limit, current }) => {
            assert_eq!(limit, 1024);
            assert!(current > limit);
        }
        other => panic!("Expected SizeLimitExceeded error, got: {:?}", other),
    }
}

#[test]
fn test_materialize_rejects_file_shadowing_directory() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[("a", b"just a file"), ("a/B.java", b"class B {}\n")],
    )
    .unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(
        matches!(result, Err(ExtractError::InvalidArchive(_))),
        "got {result:?}"
    );
}

#[test]
fn test_materialize_rejects_file_over_directory() {
    let fx = fixture("upload.archive");
    create_zip(
        &fx.archive_path,
        &[("src/Main.java", b"class Main {}\n"), ("src", b"not a directory")],
    )
    .unwrap();

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(
        matches!(result, Err(ExtractError::InvalidArchive(_))),
        "got {result:?}"
    );
}

#[test]
fn test_materialize_rejects_directory_over_file() {
    let fx = fixture("upload.archive");
    {
        use zip::write::{SimpleFileOptions, ZipWriter};

        let file = File::create(&fx.archive_path).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file("pkg", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"plain file").unwrap();
        zip.add_directory("pkg/", SimpleFileOptions::default()).unwrap();
        zip.start_file("Main.java", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"class Main {}\n").unwrap();
        zip.finish().unwrap();
    }

    let result = materialize(&fx.archive_path, &fx.output_dir, &MaterializeOptions::default());

    assert!(
        matches!(result, Err(ExtractError::InvalidArchive(_))),
        "got {result:?}"
    );
}
