//! `firestore_backup` - backup and restore tools for Firestore-style databases
//!
//! This crate provides the command-line layer around the `firestore_tree`
//! engine: argument parsing, connection configuration, logging setup, and
//! the human-readable summaries the tools print.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Connection configuration (flags, env, YAML file, service account)
//! - [`format`] - Summary formatting
//! - [`logging`] - `tracing` subscriber setup
//! - [`output`] - Backup directory and filename conventions

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod format;
pub mod logging;
pub mod output;

pub use config::{ConfigError, ConnectionConfig};
