//! Configuration management for folder-backup.
//!
//! Settings come from an optional TOML file; command-line flags override
//! them. Every section and field may be omitted.

use crate::archive::ArchiveOptions;
use crate::fs::WalkOptions;
use crate::upload::DEFAULT_REGION;
use crate::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub upload: UploadConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Follow symbolic links while walking (cycle-checked)
    pub follow_links: bool,

    /// Deflate level 1-9 (library default when unset)
    pub compression_level: Option<i64>,

    /// Write the archive to a temporary file before uploading
    pub stage_to_disk: bool,

    /// Where staged archives are written (OS temp dir when unset)
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Cloud provider region
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible storage
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Upload deadline in seconds (0 = no deadline)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Append the time of day to the default object name
    #[serde(default)]
    pub unique_name: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_timeout_secs() -> u64 {
    crate::upload::DEFAULT_UPLOAD_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            unique_name: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| BackupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.archive.compression_level {
            if !(1..=9).contains(&level) {
                return Err(BackupError::Config(format!(
                    "compression_level must be between 1 and 9, got {}",
                    level
                )));
            }
        }
        Ok(())
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            walk: WalkOptions {
                follow_links: self.archive.follow_links,
            },
            compression_level: self.archive.compression_level,
            stage_to_disk: self.archive.stage_to_disk,
            staging_dir: self.archive.staging_dir.clone(),
        }
    }

    /// Upload deadline, `None` when disabled
    pub fn upload_timeout(&self) -> Option<Duration> {
        match self.upload.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
