//! folder-backup - Main entry point
//!
//! Compresses a directory into a zip archive and uploads it to S3.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use folder_backup::upload::{unique_object_key, S3Store, UploadTarget, Uploader};
use folder_backup::{backup, utils, BackupRequest, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relative path to the directory to back up
    source: PathBuf,

    /// Name of the destination bucket
    bucket: String,

    /// The cloud provider region
    #[arg(long)]
    region: Option<String>,

    /// Object name for the uploaded archive [default: backup-<year>-<month>-<day>.zip]
    #[arg(long)]
    name: Option<String>,

    /// Include the time of day in the default object name
    #[arg(long)]
    unique_name: bool,

    /// Write the archive to a temporary file on disk before uploading
    #[arg(long = "temp-file", alias = "tempFile")]
    temp_file: bool,

    /// Follow symbolic links (cycles are reported as errors)
    #[arg(long)]
    follow_links: bool,

    /// Custom endpoint for S3-compatible storage
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Upload deadline in seconds, 0 disables it
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    /// Flags win over the configuration file
    fn apply_to(&self, config: &mut Config) {
        if let Some(region) = &self.region {
            config.upload.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = Some(endpoint.clone());
        }
        if let Some(timeout) = self.timeout {
            config.upload.timeout_secs = timeout;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        config.upload.unique_name |= self.unique_name;
        config.archive.stage_to_disk |= self.temp_file;
        config.archive.follow_links |= self.follow_links;
    }

    fn request(&self, config: &Config) -> BackupRequest {
        let mut target =
            UploadTarget::new(self.bucket.clone()).with_region(config.upload.region.clone());
        if config.upload.unique_name {
            target = target.with_key(unique_object_key(&Local::now()));
        }
        if let Some(name) = &self.name {
            target = target.with_key(name.clone());
        }

        BackupRequest {
            source: self.source.clone(),
            target,
            archive: config.archive_options(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => Config::default(),
    };
    args.apply_to(&mut config);

    // Initialize logging
    utils::logger::init(&config.log.level)?;

    tracing::info!("Starting folder-backup v{}", env!("CARGO_PKG_VERSION"));

    let request = args.request(&config);
    if let Err(e) = request.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let endpoint = config.upload.endpoint.as_deref();
    let store = S3Store::connect(request.target.region(), endpoint).await;
    let uploader = Uploader::new(store).with_timeout(config.upload_timeout());

    match backup::execute(&request, &uploader).await {
        Ok(report) => {
            tracing::info!("Backup finished successfully! {}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Backup failed: {}", e);
            std::process::exit(1);
        }
    }
}
