//! Finished archive bytes, either buffered or staged on disk.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use tempfile::NamedTempFile;

/// The bytes of a finished zip container.
///
/// A staged body owns its temporary file; the file is removed when the body
/// is dropped, whether the upload succeeded or not.
pub enum ArchiveBody {
    InMemory(Vec<u8>),
    Staged(NamedTempFile),
}

impl ArchiveBody {
    /// Size of the container in bytes
    pub fn size_bytes(&self) -> io::Result<u64> {
        match self {
            ArchiveBody::InMemory(bytes) => Ok(bytes.len() as u64),
            ArchiveBody::Staged(file) => Ok(file.as_file().metadata()?.len()),
        }
    }

    /// Location of the staged file, `None` for in-memory bodies
    pub fn staged_path(&self) -> Option<&Path> {
        match self {
            ArchiveBody::InMemory(_) => None,
            ArchiveBody::Staged(file) => Some(file.path()),
        }
    }

    /// Load the whole container into memory.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            ArchiveBody::InMemory(bytes) => Ok(bytes),
            ArchiveBody::Staged(file) => {
                let mut bytes = Vec::new();
                file.reopen()?.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }
}

impl fmt::Debug for ArchiveBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveBody::InMemory(bytes) => write!(f, "InMemory({} bytes)", bytes.len()),
            ArchiveBody::Staged(file) => write!(f, "Staged({})", file.path().display()),
        }
    }
}
