//! `firestore-tree` - export and restore engine for hierarchical document databases.
//!
//! Walks collections, documents, and subcollections to any depth, turning
//! them into a self-describing JSON tree and back. Values without a native
//! JSON form (timestamps, geopoints, document references) are written as
//! tagged maps.
//!
//! # Quick Start
//!
//! ```no_run
//! use firestore_tree::{Exporter, ExportOptions, InMemoryStore, RestoreOptions, restore_database};
//!
//! let source = InMemoryStore::open("datastore.json", "my-project").unwrap();
//! let export = Exporter::new(&source).export_database(ExportOptions::default()).unwrap();
//!
//! let mut target = InMemoryStore::new("my-project");
//! let report = restore_database(&mut target, &export.artifact, &RestoreOptions::default()).unwrap();
//! println!("restored {} documents", report.total_documents());
//! ```

pub mod artifact;
pub mod codec;
pub mod error;
pub mod export;
pub mod model;
pub mod progress;
pub mod restore;
pub mod store;

pub use artifact::{
    BackupMetadata, CollectionArtifact, CollectionTree, DatabaseArtifact, DocumentNode,
    MalformedDocument,
};
pub use codec::{TimestampMode, decode, decode_with, encode};
pub use error::{ArtifactError, BackupError, CodecError, DocumentWriteError, Result, StoreError};
pub use export::{CollectionExport, DatabaseExport, ExportOptions, ExportSummary, Exporter};
pub use model::{DocumentReference, DocumentSnapshot, Fields, GeoPoint, Timestamp, Value};
pub use progress::{NoProgress, Progress};
pub use restore::{RestoreOptions, RestoreReport, Restorer, SkippedDocument, restore_database};
pub use store::{DocumentStore, InMemoryStore, WriteBatch};
