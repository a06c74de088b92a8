//! Terminal spinner for export and restore walks.

use firestore_tree::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct SpinnerProgress {
    bar: ProgressBar,
    action: &'static str,
    documents: AtomicU64,
    commits: AtomicU64,
    start: Instant,
}

impl SpinnerProgress {
    /// Spinner labelled with `action` ("Backing up", "Restoring").
    ///
    /// Hidden when `quiet` is set or stderr is not a terminal.
    #[must_use]
    pub fn new(action: &'static str, quiet: bool) -> Self {
        let bar = if quiet || !std::io::stderr().is_terminal() {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };

        Self {
            bar,
            action,
            documents: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn documents(&self) -> u64 {
        self.documents.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        debug!(
            "{} {} documents in {:.1}s ({} commits)",
            self.action,
            self.documents(),
            self.start.elapsed().as_secs_f64(),
            self.commits()
        );
        self.bar.finish_and_clear();
    }
}

impl Progress for SpinnerProgress {
    fn collection_started(&self, path: &str) {
        self.bar.set_message(format!("{} {path}", self.action));
    }

    fn document_done(&self, collection_path: &str) {
        let done = self.documents.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.set_message(format!(
            "{} {collection_path} ({done} documents)",
            self.action
        ));
    }

    fn batch_committed(&self, collection_path: &str, writes: usize) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!("Committed batch of {writes} writes to {collection_path}");
    }
}
