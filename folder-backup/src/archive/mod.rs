//! Directory-to-zip archiving.
//!
//! One Deflate-compressed entry is written per regular file, named by its
//! path relative to the source directory with `/` separators. Directories
//! get no entry of their own. Entries appear in walk order (see
//! [`crate::fs::walker`]), so rebuilding an unchanged tree gives the same
//! entry list.
//!
//! Any error aborts the build. Nothing partial is returned: an in-memory
//! buffer is dropped and a staged temporary file is deleted.

pub mod body;

pub use body::ArchiveBody;

use crate::fs::{walk_directory_with_callback, FileMetadata, WalkOptions};
use crate::utils::format::format_bytes;
use crate::Result;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Archive building options
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Directory walk settings
    pub walk: WalkOptions,

    /// Deflate level (None = library default)
    pub compression_level: Option<i64>,

    /// Write the archive to a temporary file instead of memory
    pub stage_to_disk: bool,

    /// Directory for the staged file (None = OS temp dir)
    pub staging_dir: Option<PathBuf>,
}

/// Summary of one packed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name (relative path, `/` separated)
    pub name: String,

    /// Uncompressed size in bytes
    pub size: u64,
}

/// A finished zip container plus the list of what went into it
#[derive(Debug)]
pub struct Archive {
    body: ArchiveBody,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total uncompressed size of all entries
    pub fn uncompressed_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Size of the zip container itself
    pub fn size_bytes(&self) -> io::Result<u64> {
        self.body.size_bytes()
    }

    pub fn body(&self) -> &ArchiveBody {
        &self.body
    }

    pub fn into_body(self) -> ArchiveBody {
        self.body
    }
}

/// Build a zip archive of every regular file under `source`.
pub fn build_archive(source: &Path, options: &ArchiveOptions) -> Result<Archive> {
    info!("Reading folder and compressing: {}", source.display());

    let (body, entries) = if options.stage_to_disk {
        let mut builder = tempfile::Builder::new();
        builder.prefix("folder-backup-").suffix(".zip");
        let mut staged = match &options.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        debug!("Staging archive at {}", staged.path().display());

        // The staging dir may sit inside the source tree
        let staged_path = std::fs::canonicalize(staged.path())?;
        let entries = {
            let writer = BufWriter::new(staged.as_file_mut());
            let (writer, entries) = write_entries(source, options, writer, Some(&staged_path))?;
            writer.into_inner().map_err(|e| e.into_error())?.flush()?;
            entries
        };
        (ArchiveBody::Staged(staged), entries)
    } else {
        let (cursor, entries) = write_archive(source, options, Cursor::new(Vec::new()))?;
        (ArchiveBody::InMemory(cursor.into_inner()), entries)
    };

    let archive = Archive { body, entries };
    info!(
        "Compressed {} files ({}) into {}",
        archive.len(),
        format_bytes(archive.uncompressed_bytes()),
        format_bytes(archive.size_bytes()?)
    );

    Ok(archive)
}

/// Write the zip container for `source` into `writer`.
///
/// Returns the writer positioned after the central directory, together with
/// the entries in the order they were written.
pub fn write_archive<W: Write + Seek>(
    source: &Path,
    options: &ArchiveOptions,
    writer: W,
) -> Result<(W, Vec<ArchiveEntry>)> {
    write_entries(source, options, writer, None)
}

/// Like [`write_archive`], leaving out the file at `exclude` (a canonical path).
fn write_entries<W: Write + Seek>(
    source: &Path,
    options: &ArchiveOptions,
    writer: W,
    exclude: Option<&Path>,
) -> Result<(W, Vec<ArchiveEntry>)> {
    let mut zip = ZipWriter::new(writer);
    let mut entries = Vec::new();

    walk_directory_with_callback(source, &options.walk, |file| -> Result<()> {
        if let Some(exclude) = exclude {
            if file.path.file_name() == exclude.file_name()
                && std::fs::canonicalize(&file.path)? == exclude
            {
                debug!("Skipping staged archive: {}", file.path.display());
                return Ok(());
            }
        }

        let mut src = File::open(&file.path)?;
        let metadata = FileMetadata::from_file(&src)?;

        zip.start_file(
            file.entry_name.as_str(),
            entry_options(&metadata, options.compression_level),
        )?;
        let size = io::copy(&mut src, &mut zip)?;
        debug!("Added {} ({} bytes)", file.entry_name, size);

        entries.push(ArchiveEntry {
            name: file.entry_name.clone(),
            size,
        });
        Ok(())
    })?;

    let writer = zip.finish()?;
    Ok((writer, entries))
}

fn entry_options(metadata: &FileMetadata, level: Option<i64>) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(level)
        .large_file(metadata.size >= ZIP64_THRESHOLD);

    if let Some(modified) = metadata.modified.as_ref().and_then(zip_datetime) {
        options = options.last_modified_time(modified);
    }
    if let Some(mode) = metadata.permissions {
        options = options.unix_permissions(mode);
    }

    options
}

/// Zip timestamps only cover 1980..=2107; anything else keeps the default.
fn zip_datetime(time: &NaiveDateTime) -> Option<zip::DateTime> {
    let year = u16::try_from(time.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackupError;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn sample_tree() -> io::Result<TempDir> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        fs::create_dir_all(root.join("docs/drafts"))?;
        fs::create_dir(root.join("empty"))?;
        fs::write(root.join("readme.txt"), b"hello backup")?;
        fs::write(root.join("docs/report.csv"), "a,b,c\n".repeat(500))?;
        fs::write(root.join("docs/drafts/notes.md"), b"# notes")?;
        fs::write(root.join("zero.bin"), b"")?;

        Ok(temp_dir)
    }

    fn read_entries(bytes: Vec<u8>) -> BTreeMap<String, Vec<u8>> {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = BTreeMap::new();

        for i in 0..zip.len() {
            let mut file = zip.by_index(i).unwrap();
            assert!(!file.is_dir());
            assert_eq!(file.compression(), CompressionMethod::Deflated);

            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            let previous = out.insert(file.name().to_string(), content);
            assert!(previous.is_none(), "duplicate entry {}", file.name());
        }

        out
    }

    fn source_files(root: &Path) -> BTreeMap<String, Vec<u8>> {
        crate::fs::walk_directory(root, &WalkOptions::default())
            .unwrap()
            .into_iter()
            .map(|f| (f.entry_name, fs::read(f.path).unwrap()))
            .collect()
    }

    #[test]
    fn test_entries_match_source_files() -> Result<()> {
        let tree = sample_tree()?;
        let archive = build_archive(tree.path(), &ArchiveOptions::default())?;

        let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["docs/drafts/notes.md", "docs/report.csv", "readme.txt", "zero.bin"]
        );
        assert_eq!(archive.uncompressed_bytes(), 7 + 3000 + 12);

        let packed = read_entries(archive.into_body().into_bytes()?);
        assert_eq!(packed, source_files(tree.path()));
        Ok(())
    }

    #[test]
    fn test_deflate_shrinks_repetitive_content() -> Result<()> {
        let tree = sample_tree()?;
        let archive = build_archive(tree.path(), &ArchiveOptions::default())?;

        assert!(archive.size_bytes()? < archive.uncompressed_bytes());
        Ok(())
    }

    #[test]
    fn test_rebuild_is_stable() -> Result<()> {
        let tree = sample_tree()?;

        let first = build_archive(tree.path(), &ArchiveOptions::default())?;
        let second = build_archive(tree.path(), &ArchiveOptions::default())?;

        assert_eq!(first.entries(), second.entries());
        assert_eq!(
            read_entries(first.into_body().into_bytes()?),
            read_entries(second.into_body().into_bytes()?)
        );
        Ok(())
    }

    #[test]
    fn test_empty_directory_gives_empty_archive() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("nothing_here"))?;

        let archive = build_archive(temp_dir.path(), &ArchiveOptions::default())?;
        assert!(archive.is_empty());

        let packed = read_entries(archive.into_body().into_bytes()?);
        assert!(packed.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = build_archive(&temp_dir.path().join("missing"), &ArchiveOptions::default());
        assert!(matches!(result, Err(BackupError::Io(_))));
    }

    #[test]
    fn test_staged_archive_matches_in_memory() -> Result<()> {
        let tree = sample_tree()?;
        let staging = TempDir::new()?;

        let options = ArchiveOptions {
            stage_to_disk: true,
            staging_dir: Some(staging.path().to_path_buf()),
            ..ArchiveOptions::default()
        };
        let staged = build_archive(tree.path(), &options)?;
        let staged_path = staged
            .body()
            .staged_path()
            .map(Path::to_path_buf)
            .expect("archive should be staged");
        assert!(staged_path.starts_with(staging.path()));
        assert_eq!(fs::metadata(&staged_path)?.len(), staged.size_bytes()?);

        let in_memory = build_archive(tree.path(), &ArchiveOptions::default())?;
        assert_eq!(staged.entries(), in_memory.entries());
        assert_eq!(
            read_entries(staged.into_body().into_bytes()?),
            read_entries(in_memory.into_body().into_bytes()?)
        );
        assert!(!staged_path.exists());
        Ok(())
    }

    #[test]
    fn test_staging_inside_source_is_not_archived() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("a.txt"), b"alpha")?;

        let options = ArchiveOptions {
            stage_to_disk: true,
            staging_dir: Some(temp_dir.path().to_path_buf()),
            ..ArchiveOptions::default()
        };
        let archive = build_archive(temp_dir.path(), &options)?;

        let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);

        let packed = read_entries(archive.into_body().into_bytes()?);
        assert_eq!(packed.keys().collect::<Vec<_>>(), vec!["a.txt"]);
        Ok(())
    }

    #[test]
    fn test_staging_in_nested_source_dir_is_not_archived() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let staging = temp_dir.path().join("tmp");
        fs::create_dir(&staging)?;
        fs::write(temp_dir.path().join("a.txt"), b"alpha")?;
        fs::write(staging.join("keep.txt"), b"kept")?;

        let options = ArchiveOptions {
            stage_to_disk: true,
            staging_dir: Some(staging),
            ..ArchiveOptions::default()
        };
        let archive = build_archive(temp_dir.path(), &options)?;

        let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "tmp/keep.txt"]);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_failed_build_discards_staged_file() -> Result<()> {
        let tree = sample_tree()?;
        std::os::unix::fs::symlink("does-not-exist", tree.path().join("broken"))?;
        let staging = TempDir::new()?;

        let options = ArchiveOptions {
            walk: WalkOptions { follow_links: true },
            stage_to_disk: true,
            staging_dir: Some(staging.path().to_path_buf()),
            ..ArchiveOptions::default()
        };
        assert!(build_archive(tree.path(), &options).is_err());
        assert_eq!(fs::read_dir(staging.path())?.count(), 0);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_unix_permissions_recorded() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new()?;
        let script = temp_dir.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750))?;

        let archive = build_archive(temp_dir.path(), &ArchiveOptions::default())?;
        let mut zip = ZipArchive::new(Cursor::new(archive.into_body().into_bytes()?))?;
        let entry = zip.by_name("run.sh")?;
        assert_eq!(entry.unix_mode().map(|m| m & 0o777), Some(0o750));
        Ok(())
    }

    #[test]
    fn test_zip_datetime_range() {
        let in_range = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(14, 5, 6))
            .unwrap();
        let converted = zip_datetime(&in_range).unwrap();
        assert_eq!(converted.year(), 2024);
        assert_eq!(converted.month(), 3);
        assert_eq!(converted.second(), 6);

        let too_old = NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert!(zip_datetime(&too_old).is_none());
    }
}
