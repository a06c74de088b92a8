//! `firestore-backup` - export a Firestore database to a JSON backup file.

use firestore_backup::cli::run_backup;

fn main() {
    if let Err(e) = run_backup() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
