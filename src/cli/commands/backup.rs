//! Backup command implementation.
//!
//! Whole-database backup, single-collection backup, and collection listing.

use anyhow::{Context, Result};
use chrono::Local;
use firestore_tree::artifact::write_pretty;
use firestore_tree::{DocumentStore, ExportOptions, Exporter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::BackupCli;
use crate::cli::progress::SpinnerProgress;
use crate::config::{ConnectionConfig, ConnectionOverrides, DEFAULT_BACKUP_DIR};
use crate::format::{
    backup_summary_lines, collection_backup_line, collection_list_lines, print_lines,
};
use crate::output::{
    collection_backup_filename, database_backup_filename, display_path, prepare_output_path,
};

/// Execute the backup command.
///
/// # Errors
///
/// Returns an error if configuration fails, collections cannot be listed,
/// or the backup file cannot be written.
pub fn execute(args: &BackupCli) -> Result<()> {
    let (config, file) = ConnectionConfig::from_overrides(&ConnectionOverrides::from(&args.connection))?;
    let store = config.connect().context("Failed to open the document store")?;

    if args.list_collections {
        list_collections(&store)?;
        return Ok(());
    }

    let backup_dir = args
        .backup_dir
        .clone()
        .or(file.backup_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
    let progress = SpinnerProgress::new("Backing up", args.log.quiet);

    let result = args.collection.as_deref().map_or_else(
        || {
            backup_database(
                &store,
                &progress,
                &backup_dir,
                args.output.as_deref(),
                !args.no_metadata,
            )
        },
        |collection| {
            backup_collection(
                &store,
                &progress,
                &backup_dir,
                collection,
                args.output.as_deref(),
            )
        },
    );
    progress.finish();
    result.map(|_| ())
}

/// Back up every root collection into one file.
///
/// Returns the path of the written backup.
///
/// # Errors
///
/// Returns an error if root collections cannot be listed or the file cannot be written.
pub fn backup_database<S: DocumentStore + ?Sized>(
    store: &S,
    progress: &SpinnerProgress,
    backup_dir: &Path,
    output: Option<&str>,
    include_metadata: bool,
) -> Result<PathBuf> {
    info!("Starting Firestore database backup...");

    let file_name = output.map_or_else(|| database_backup_filename(Local::now()), str::to_string);
    let output_path = prepare_output_path(backup_dir, &file_name)
        .with_context(|| format!("Failed to create backup directory {}", backup_dir.display()))?;

    let export = Exporter::new(store)
        .with_progress(progress)
        .export_database(ExportOptions { include_metadata })?;
    for path in &export.summary.failed_collections {
        warn!("Collection {path} was only partially backed up");
    }

    let file_size = write_pretty(&output_path, &export.artifact)
        .with_context(|| format!("Failed to write backup file {}", output_path.display()))?;

    print_lines(backup_summary_lines(
        &display_path(&output_path),
        &export.summary,
        include_metadata,
        file_size,
    ));
    Ok(output_path)
}

/// Back up one root collection (and everything below it) into its own file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn backup_collection<S: DocumentStore + ?Sized>(
    store: &S,
    progress: &SpinnerProgress,
    backup_dir: &Path,
    collection: &str,
    output: Option<&str>,
) -> Result<PathBuf> {
    info!("Starting backup of collection: {collection}");

    let file_name = output.map_or_else(
        || collection_backup_filename(collection, Local::now()),
        str::to_string,
    );
    let output_path = prepare_output_path(backup_dir, &file_name)
        .with_context(|| format!("Failed to create backup directory {}", backup_dir.display()))?;

    let artifact = Exporter::new(store)
        .with_progress(progress)
        .export_one_collection(collection);
    if let Some(error) = artifact.data.error() {
        warn!("Collection {collection} was only partially backed up: {error}");
    }

    write_pretty(&output_path, &artifact)
        .with_context(|| format!("Failed to write backup file {}", output_path.display()))?;

    println!("{}", collection_backup_line(&display_path(&output_path)));
    Ok(output_path)
}

/// Print the root collection names.
///
/// # Errors
///
/// Returns an error if the store cannot list collections.
pub fn list_collections<S: DocumentStore + ?Sized>(store: &S) -> Result<Vec<String>> {
    let names = Exporter::new(store)
        .list_collections()
        .context("Error listing collections")?;
    print_lines(collection_list_lines(&names));
    Ok(names)
}
