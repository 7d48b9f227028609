//! Default object keys derived from the current date.

use chrono::{Datelike, Timelike};

/// `backup-<year>-<month>-<day>.zip`, month and day unpadded.
pub fn default_object_key<T: Datelike>(date: &T) -> String {
    format!("backup-{}-{}-{}.zip", date.year(), date.month(), date.day())
}

/// Like [`default_object_key`] with the time of day appended, so several
/// runs on one day do not overwrite each other.
pub fn unique_object_key<T: Datelike + Timelike>(time: &T) -> String {
    format!(
        "backup-{}-{}-{}-{:02}{:02}{:02}.zip",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    )
}
