//! Output formatting for the backup and restore commands.
//!
//! Human-readable summaries go to stdout; diagnostics go through `tracing`
//! to stderr.

mod text;

pub use text::{
    backup_summary_lines, collection_backup_line, collection_list_lines, format_megabytes,
    markers, metadata_lines, restore_summary_lines, restore_warning_lines, skipped_lines,
};

/// Print lines to stdout.
pub fn print_lines<I, S>(lines: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        println!("{}", line.as_ref());
    }
}
