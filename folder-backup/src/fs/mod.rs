//! File system access for the archiver.

pub mod metadata;
pub mod walker;

pub use metadata::FileMetadata;
pub use walker::{walk_directory, walk_directory_with_callback, FileInfo, WalkOptions};
