//! `firestore-quick-backup` - full backup with default settings.

use firestore_backup::cli::run_quick_backup;

fn main() {
    if let Err(e) = run_quick_backup() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
