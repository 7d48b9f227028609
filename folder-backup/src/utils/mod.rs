//! Utility modules for folder-backup.

pub mod errors;
pub mod format;
pub mod logger;

pub use errors::{BackupError, Result};
