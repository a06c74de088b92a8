//! Text formatting for command summaries.
//!
//! Each function returns the lines to print; callers decide where they go.

use firestore_tree::{BackupMetadata, ExportSummary, RestoreReport, SkippedDocument};
use std::path::Path;

/// Line markers.
pub mod markers {
    /// Completed successfully.
    pub const DONE: &str = "✅";
    /// Failure.
    pub const FAILED: &str = "❌";
    /// Destructive operation ahead.
    pub const WARNING: &str = "⚠️ ";
    pub const FILE: &str = "📁";
    pub const COLLECTIONS: &str = "📊";
    pub const DOCUMENTS: &str = "📄";
    pub const SIZE: &str = "💾";
    /// Prefix for preview output.
    pub const DRY_RUN: &str = "[DRY RUN]";
}

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Format a byte count as megabytes with two decimals.
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Summary printed after a whole-database backup is written.
///
/// Document totals are shown only when metadata was included.
#[must_use]
pub fn backup_summary_lines(
    path: &Path,
    summary: &ExportSummary,
    include_metadata: bool,
    file_size: u64,
) -> Vec<String> {
    let mut lines = vec![
        format!("{} Backup completed successfully!", markers::DONE),
        format!("{} File: {}", markers::FILE, path.display()),
        format!("{} Collections: {}", markers::COLLECTIONS, summary.collections),
    ];
    if include_metadata {
        lines.push(format!(
            "{} Total documents: {} ({} including subcollections)",
            markers::DOCUMENTS,
            summary.documents,
            summary.nested_documents
        ));
    } else {
        lines.push(format!("{} Total documents: N/A", markers::DOCUMENTS));
    }
    lines.push(format!(
        "{} File size: {}",
        markers::SIZE,
        format_megabytes(file_size)
    ));
    for path in &summary.failed_collections {
        lines.push(format!(
            "{} Incomplete read recorded under _error: {path}",
            markers::WARNING
        ));
    }
    lines
}

/// Line printed after a single-collection backup is written.
#[must_use]
pub fn collection_backup_line(path: &Path) -> String {
    format!(
        "{} Collection backup completed: {}",
        markers::DONE,
        path.display()
    )
}

/// Root collection listing.
#[must_use]
pub fn collection_list_lines(names: &[String]) -> Vec<String> {
    std::iter::once("Collections in database:".to_string())
        .chain(names.iter().map(|name| format!("  - {name}")))
        .collect()
}

/// Metadata block shown before a restore.
#[must_use]
pub fn metadata_lines(metadata: &BackupMetadata) -> Vec<String> {
    let or_unknown = |value: &str| {
        if value.is_empty() {
            "Unknown".to_string()
        } else {
            value.to_string()
        }
    };
    let mut lines = vec![
        format!("Backup created: {}", or_unknown(&metadata.backup_time)),
        format!("Original project: {}", or_unknown(&metadata.project_id)),
        format!("Collections: {}", metadata.total_collections),
        format!("Documents: {}", metadata.total_documents),
    ];
    if let Some(nested) = metadata.total_documents_nested {
        lines.push(format!("Documents (all levels): {nested}"));
    }
    lines
}

/// Warning shown before asking for confirmation.
#[must_use]
pub fn restore_warning_lines(backup_file: &Path, filter: Option<&[String]>) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} WARNING: This operation will overwrite existing data in your Firestore database!",
            markers::WARNING
        ),
        format!("Backup file: {}", backup_file.display()),
    ];
    match filter {
        Some(names) if !names.is_empty() => {
            lines.push(format!("Collections to restore: {}", names.join(", ")));
        }
        _ => lines.push("Will restore ALL collections from backup".to_string()),
    }
    lines
}

/// Per-collection counts, totals, and skipped documents after a restore.
#[must_use]
pub fn restore_summary_lines(report: &RestoreReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .collections
        .iter()
        .map(|(name, count)| {
            if report.dry_run {
                format!("  Would restore {count} documents to collection: {name}")
            } else {
                format!(
                    "{} Restored {count} documents to collection: {name}",
                    markers::DONE
                )
            }
        })
        .collect();

    lines.push(String::new());
    if report.dry_run {
        lines.push(format!("{} Restore completed!", markers::DRY_RUN));
    } else {
        lines.push(format!("{} Restore completed!", markers::DONE));
    }
    lines.push(format!(
        "{} Total collections: {}",
        markers::COLLECTIONS,
        report.collections.len()
    ));
    lines.push(format!(
        "{} Total documents: {}",
        markers::DOCUMENTS,
        report.total_documents()
    ));

    lines.extend(skipped_lines(&report.skipped));
    lines
}

/// Header plus one line per skipped document; empty when nothing was skipped.
#[must_use]
pub fn skipped_lines(skipped: &[SkippedDocument]) -> Vec<String> {
    if skipped.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "{} Skipped {} document(s):",
        markers::WARNING,
        skipped.len()
    )];
    lines.extend(skipped.iter().map(|s| format!("  - {}: {}", s.path, s.reason)));
    lines
}
