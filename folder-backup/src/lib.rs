//! folder-backup library
//!
//! Zips a directory and uploads the archive to S3-compatible object storage
//! with a single put.

pub mod archive;
pub mod backup;
pub mod config;
pub mod fs;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use backup::{execute, BackupReport, BackupRequest};
pub use config::Config;
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
