//! Quick backup: check the credential file, back up everything with
//! defaults, then list the collections.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::QuickBackupCli;
use crate::cli::commands::backup::{backup_database, list_collections};
use crate::cli::progress::SpinnerProgress;
use crate::config::{ConfigError, ConnectionConfig, ConnectionOverrides, DEFAULT_BACKUP_DIR};
use crate::format::{markers, print_lines};

const SERVICE_ACCOUNT_HELP: [&str; 5] = [
    "\nTo get your service account file:",
    "1. Go to Firebase Console > Project Settings",
    "2. Go to Service Accounts tab",
    "3. Click 'Generate new private key'",
    "4. Save the JSON file and pass it with --service-account or FIREBASE_SERVICE_ACCOUNT_PATH",
];

/// Execute the quick backup.
///
/// # Errors
///
/// Returns an error if the service account file is missing or the backup fails.
pub fn execute(args: &QuickBackupCli) -> Result<()> {
    println!("🔥 Starting Firestore Database Backup");
    println!("{}", "=".repeat(50));

    let (config, file) =
        match ConnectionConfig::from_overrides(&ConnectionOverrides::from(&args.connection)) {
            Ok(resolved) => resolved,
            Err(err @ (ConfigError::ServiceAccountNotFound { .. } | ConfigError::MissingServiceAccount)) => {
                println!("{} {err}", markers::FAILED);
                print_lines(SERVICE_ACCOUNT_HELP);
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
    let store = config.connect().context("Failed to open the document store")?;

    let backup_dir = args
        .backup_dir
        .clone()
        .or(file.backup_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));

    println!("\n📦 Creating full database backup...");
    let progress = SpinnerProgress::new("Backing up", args.log.quiet);
    let backup = backup_database(&store, &progress, &backup_dir, None, true);
    progress.finish();
    let path = backup.context("Backup failed")?;

    println!("📁 Backup saved to: {}", path.display());

    println!("\n📋 Collections in your database:");
    list_collections(&store)?;
    Ok(())
}
