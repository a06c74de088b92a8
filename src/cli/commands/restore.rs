//! Restore command implementation.
//!
//! A live restore overwrites documents, so it asks for a literal `yes`
//! before anything is opened or written. `--dry-run` only counts.

use anyhow::{Context, Result};
use firestore_tree::artifact::load_database;
use firestore_tree::restore::DEFAULT_BATCH_SIZE;
use firestore_tree::{RestoreOptions, Restorer, TimestampMode};
use std::io::{self, BufRead, Write};
use tracing::info;

use crate::cli::RestoreCli;
use crate::cli::progress::SpinnerProgress;
use crate::config::{ConnectionConfig, ConnectionOverrides};
use crate::format::{
    markers, metadata_lines, print_lines, restore_summary_lines, restore_warning_lines,
    skipped_lines,
};

const CONFIRMATION_PROMPT: &str = "\nAre you sure you want to proceed? (yes/no): ";

/// Read one answer line and accept only `yes` (any case).
///
/// # Errors
///
/// Returns an error if reading from `input` fails.
pub fn read_confirmation<R: BufRead>(input: &mut R) -> io::Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("yes"))
}

/// Execute the restore command, reading confirmation from stdin.
///
/// # Errors
///
/// Returns an error if configuration fails, the backup file is invalid, or
/// a batch commit fails.
pub fn execute(args: &RestoreCli) -> Result<()> {
    let stdin = io::stdin();
    execute_with_input(args, &mut stdin.lock())
}

/// Execute the restore command with an explicit confirmation source.
///
/// # Errors
///
/// As [`execute`].
pub fn execute_with_input<R: BufRead>(args: &RestoreCli, input: &mut R) -> Result<()> {
    let filter = (!args.collections.is_empty()).then_some(args.collections.as_slice());

    if !args.dry_run {
        print_lines(restore_warning_lines(&args.backup_file, filter));
        print!("{CONFIRMATION_PROMPT}");
        io::stdout().flush()?;
        if !read_confirmation(input).context("Failed to read confirmation")? {
            println!("Restore cancelled.");
            return Ok(());
        }
    }

    let (config, file) =
        ConnectionConfig::from_overrides(&ConnectionOverrides::from(&args.connection))?;
    let batch_size = args
        .batch_size
        .or(file.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let timestamp_mode = if args.preserve_timestamps {
        TimestampMode::Preserve
    } else {
        TimestampMode::ServerTime
    };

    let prefix = if args.dry_run {
        format!("{} ", markers::DRY_RUN)
    } else {
        String::new()
    };
    println!(
        "{prefix}Starting Firestore database restore from: {}",
        args.backup_file.display()
    );

    let artifact = load_database(&args.backup_file)?;
    if let Some(metadata) = &artifact.metadata {
        print_lines(metadata_lines(metadata));
    }
    if let Some(names) = filter {
        println!("Filtering to collections: {}", names.join(", "));
    }

    let mut store = config.connect().context("Failed to open the document store")?;
    let options = RestoreOptions {
        dry_run: args.dry_run,
        collections: filter.map(<[String]>::to_vec),
        batch_size,
        timestamp_mode,
    };

    if args.dry_run {
        println!("\n{} Analyzing backup file...", markers::DRY_RUN);
    } else {
        if timestamp_mode == TimestampMode::ServerTime {
            println!(
                "Note: timestamp fields are written as the restore time; use --preserve-timestamps to keep recorded values."
            );
        }
        println!("\nRestoring collections...");
    }

    let restorer = Restorer::new(&mut store, batch_size)?;
    let progress = SpinnerProgress::new("Restoring", args.log.quiet);
    let mut restorer = restorer
        .with_timestamp_mode(timestamp_mode)
        .with_progress(&progress);
    let result = restorer.restore_database(&artifact, &options);
    progress.finish();
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            print_lines(skipped_lines(restorer.skipped()));
            return Err(err.into());
        }
    };

    print_lines(restore_summary_lines(&report));
    if !report.dry_run {
        info!("Restore completed with {} batch commits", report.commits);
        println!("\nRestore completed successfully!");
    }
    Ok(())
}
