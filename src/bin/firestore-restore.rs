//! `firestore-restore` - replay a JSON backup file into a Firestore database.

use firestore_backup::cli::run_restore;

fn main() {
    if let Err(e) = run_restore() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
