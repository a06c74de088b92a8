//! Backup directory and filename conventions.

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FILENAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `firestore_backup_<YYYYMMDD_HHMMSS>.json`
#[must_use]
pub fn database_backup_filename(now: DateTime<Local>) -> String {
    format!("firestore_backup_{}.json", now.format(FILENAME_TIME_FORMAT))
}

/// `firestore_<collection>_backup_<YYYYMMDD_HHMMSS>.json`
#[must_use]
pub fn collection_backup_filename(collection: &str, now: DateTime<Local>) -> String {
    format!(
        "firestore_{collection}_backup_{}.json",
        now.format(FILENAME_TIME_FORMAT)
    )
}

/// Create `backup_dir` if needed and return the path for `file_name` inside it.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn prepare_output_path(backup_dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(backup_dir)?;
    Ok(backup_dir.join(file_name))
}

/// Path for display, without the Windows verbatim prefix.
#[must_use]
pub fn display_path(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
