//! Error types for `firestore-tree`.
//!
//! Failures are split by the unit of work they belong to:
//! - [`StoreError`] - the backing store could not list, stream, or commit
//! - [`CodecError`] - a tagged JSON value could not be turned back into a [`Value`](crate::Value)
//! - [`ArtifactError`] - a backup file is unreadable or has the wrong shape
//! - [`DocumentWriteError`] - one backed-up document could not be prepared for writing
//!
//! [`BackupError`] aggregates them for callers that only need one type.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a [`DocumentStore`](crate::DocumentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Listing the root collections failed.
    #[error("Failed to list collections: {0}")]
    ListCollections(String),

    /// Streaming the documents of a collection failed (at start or mid-stream).
    #[error("Failed to read collection {path}: {reason}")]
    Read { path: String, reason: String },

    /// Listing the subcollections of a document failed.
    #[error("Failed to list subcollections of {path}: {reason}")]
    ListSubcollections { path: String, reason: String },

    /// A batch commit was rejected.
    #[error("Batch commit failed: {0}")]
    Commit(String),

    /// A batch holds more writes than the store accepts in one commit.
    #[error("Batch of {count} writes exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    /// A collection or document path is malformed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn read(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A tagged value in a backup could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A `_firestore_geopoint` map without usable coordinates.
    #[error("Malformed geopoint: {0}")]
    MalformedGeoPoint(String),

    /// A `_firestore_reference` whose value is not a document path.
    #[error("Malformed document reference: {0}")]
    MalformedReference(String),

    /// A `_firestore_timestamp` map that carries no parseable instant.
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// A document `data` payload that is not a JSON object.
    #[error("Document data must be an object, found {found}")]
    InvalidDocumentData { found: &'static str },
}

/// One document in a backup could not be turned into a write.
///
/// These never abort a restore; the document is skipped and reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentWriteError {
    /// The `data` payload could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The document ID (or a subcollection name) does not form a valid path.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The document entry is not a document object.
    #[error("Malformed document entry: {0}")]
    MalformedEntry(String),
}

/// A backup artifact could not be loaded.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The file could not be read.
    #[error("Failed to load backup file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("Failed to load backup file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The top-level object has no `collections` key.
    #[error("Invalid backup file: missing 'collections' key")]
    MissingCollections,

    /// The JSON is valid but does not have the artifact layout.
    #[error("Invalid backup file: {0}")]
    Shape(String),
}

/// Primary error type for `firestore-tree` operations.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A batch commit failed while restoring a collection. Batches committed
    /// before the failure stay applied.
    #[error("Restore of {collection} aborted after {queued} queued documents: {source}")]
    CommitAborted {
        collection: String,
        queued: usize,
        #[source]
        source: StoreError,
    },

    /// Batch size outside `1..=MAX_BATCH_WRITES`.
    #[error("Batch size must be between 1 and {max}, got {size}")]
    InvalidBatchSize { size: usize, max: usize },

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using `BackupError`.
pub type Result<T> = std::result::Result<T, BackupError>;
