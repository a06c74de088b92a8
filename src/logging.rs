//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Diagnostics go to stderr so stdout carries only the command summaries.
//!
//! # Log Levels
//!
//! - `error`: aborted commits, failed commands
//! - `warn`: partial collection reads, skipped documents
//! - `info`: per-collection progress (default)
//! - `debug`: subcollections and batch commits (`-v`)
//! - `trace`: everything (`-vv`)

use std::io;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map `-v` count and `-q` to a level.
#[must_use]
pub const fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG`, when set, overrides the level derived from the flags.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool, json: bool) -> io::Result<()> {
    let filter = build_env_filter(level_for(verbose, quiet));

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr).with_target(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init()
    };

    result.map_err(|e| io::Error::other(e.to_string()))
}

/// Best-effort logging for tests; repeated calls are ignored.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(Level::DEBUG))
        .with_test_writer()
        .try_init();
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn.
        EnvFilter::new(format!(
            "warn,firestore_backup={level},firestore_tree={level}"
        ))
    })
}
