//! Command-line interface for the backup tools.
//!
//! Three entry points share connection and logging flags:
//! `firestore-backup`, `firestore-restore`, and `firestore-quick-backup`.

pub mod commands;
pub mod progress;

use anyhow::Result;
use clap::{Args, Parser};
use std::path::PathBuf;

use crate::config::ConnectionOverrides;
use crate::logging;

/// Connection settings shared by every entry point.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Path to Firebase service account JSON file
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT_PATH", value_name = "PATH")]
    pub service_account: Option<PathBuf>,

    /// Firebase project ID (defaults to the one in the service account file)
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Datastore file backing the document store [default: firestore-datastore.json]
    #[arg(long, env = "FIRESTORE_DATASTORE_PATH", value_name = "PATH")]
    pub datastore: Option<PathBuf>,

    /// YAML config file supplying defaults
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

impl From<&ConnectionArgs> for ConnectionOverrides {
    fn from(args: &ConnectionArgs) -> Self {
        Self {
            service_account: args.service_account.clone(),
            project_id: args.project_id.clone(),
            datastore: args.datastore.clone(),
            config_file: args.config_file.clone(),
        }
    }
}

/// Logging flags shared by every entry point.
#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,
}

impl LogArgs {
    fn init(&self) -> Result<()> {
        logging::init_logging(self.verbose, self.quiet, self.log_json)
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
    }
}

/// Backup Firestore database.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "firestore-backup", version, about = "Backup Firestore database", long_about = None)]
pub struct BackupCli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// Backup specific collection only
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Output filename, placed inside the backup directory
    #[arg(long, value_name = "FILE")]
    pub output: Option<String>,

    /// List all collections
    #[arg(long)]
    pub list_collections: bool,

    /// Exclude backup metadata
    #[arg(long)]
    pub no_metadata: bool,

    /// Directory for backup files [default: backups]
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// Restore Firestore database from backup.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "firestore-restore",
    version,
    about = "Restore Firestore database from backup",
    long_about = None,
    after_help = "Without --dry-run the restore overwrites existing documents and asks for confirmation."
)]
pub struct RestoreCli {
    /// Path to backup JSON file
    pub backup_file: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// Analyze backup without writing to database
    #[arg(long)]
    pub dry_run: bool,

    /// Specific collections to restore
    #[arg(long, num_args = 1.., value_name = "NAME")]
    pub collections: Vec<String>,

    /// Writes per batch commit (1-500) [default: 500]
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Keep recorded timestamp values instead of writing the restore time
    #[arg(long)]
    pub preserve_timestamps: bool,
}

/// Full backup with defaults, then list collections.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "firestore-quick-backup",
    version,
    about = "Create a full Firestore backup with default settings",
    long_about = None
)]
pub struct QuickBackupCli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// Directory for backup files [default: backups]
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// Run `firestore-backup`.
///
/// # Errors
///
/// Returns an error if configuration, the store, or writing the backup fails.
pub fn run_backup() -> Result<()> {
    let cli = BackupCli::parse();
    cli.log.init()?;
    commands::backup::execute(&cli)
}

/// Run `firestore-restore`.
///
/// # Errors
///
/// Returns an error if configuration, the backup file, or a batch commit fails.
pub fn run_restore() -> Result<()> {
    let cli = RestoreCli::parse();
    cli.log.init()?;
    commands::restore::execute(&cli)
}

/// Run `firestore-quick-backup`.
///
/// # Errors
///
/// Returns an error if the credential file is missing or the backup fails.
pub fn run_quick_backup() -> Result<()> {
    let cli = QuickBackupCli::parse();
    cli.log.init()?;
    commands::quick::execute(&cli)
}
