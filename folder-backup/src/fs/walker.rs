//! Deterministic directory traversal for archiving.
//!
//! The walk is depth-first and every directory is read sorted by file name,
//! so the same tree always yields files in the same order. A subdirectory's
//! files appear at the position the subdirectory's own name sorts to.
//!
//! Symbolic links are never followed unless [`WalkOptions::follow_links`] is
//! set; by default they are skipped. When following, a link that points back
//! at one of its ancestors is reported as an error instead of looping.

use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links (cycle-checked)
    pub follow_links: bool,
}

/// A regular file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path with `/` separators, used as the archive entry name
    pub entry_name: String,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> io::Result<Self> {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is outside of {}", path.display(), root.display()),
            )
        })?;
        let entry_name = entry_name(relative_path)?;

        Ok(Self { path, entry_name })
    }
}

/// Join the components of a relative path with `/`.
///
/// Fails on non UTF-8 names, since a lossy conversion could make two
/// distinct files collide on one entry name.
pub fn entry_name(relative_path: &Path) -> io::Result<String> {
    let mut parts = Vec::new();

    for component in relative_path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("path is not valid UTF-8: {}", relative_path.display()),
                    )
                })?;
                parts.push(part);
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("not a plain relative path: {}", relative_path.display()),
                ))
            }
        }
    }

    if parts.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "empty relative path",
        ));
    }

    Ok(parts.join("/"))
}

/// Walk a directory tree and collect all regular files
///
/// # Arguments
/// * `root` - Root directory to start walking from
/// * `options` - Walking options (symlink policy)
///
/// # Returns
/// * `Ok(Vec<FileInfo>)` - Files in walk order
/// * `Err(io::Error)` - If any directory or entry cannot be read
///
/// # Example
/// ```no_run
/// use folder_backup::fs::walker::{walk_directory, WalkOptions};
/// use std::path::Path;
///
/// let files = walk_directory(Path::new("data"), &WalkOptions::default()).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn walk_directory(root: &Path, options: &WalkOptions) -> io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    walk_directory_with_callback(root, options, |file| -> io::Result<()> {
        files.push(file.clone());
        Ok(())
    })?;

    Ok(files)
}

/// Walk a directory tree and hand each regular file to `callback` as soon
/// as it is found. The first error, from the walk or the callback, stops
/// the walk and is returned.
pub fn walk_directory_with_callback<F, E>(
    root: &Path,
    options: &WalkOptions,
    mut callback: F,
) -> Result<(), E>
where
    F: FnMut(&FileInfo) -> Result<(), E>,
    E: From<io::Error>,
{
    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();

        // Directories are implied by entry names
        if file_type.is_dir() {
            continue;
        }

        // Only reachable when links are not followed
        if file_type.is_symlink() {
            debug!("Skipping symbolic link: {}", entry.path().display());
            continue;
        }

        if !file_type.is_file() {
            warn!("Skipping special file: {}", entry.path().display());
            continue;
        }

        let file_info = FileInfo::from_entry(&entry, root)?;
        callback(&file_info)?;
    }

    Ok(())
}
