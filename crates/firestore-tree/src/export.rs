//! Export: walk the live document tree and build a backup artifact.
//!
//! The walk is depth-first and sequential. A collection whose stream fails
//! keeps the documents read so far and records the failure under `_error`;
//! siblings and parents carry on.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::artifact::{
    BACKUP_VERSION, BackupMetadata, CollectionArtifact, CollectionTree, DatabaseArtifact,
    DocumentNode, backup_timestamp,
};
use crate::codec::encode_fields;
use crate::error::{Result, StoreError};
use crate::model::child_path;
use crate::progress::{NoProgress, Progress};
use crate::store::DocumentStore;

/// Outcome of exporting one collection.
#[derive(Debug)]
pub enum CollectionExport {
    /// Every document was read.
    Complete(CollectionTree),
    /// The stream failed; `tree` holds what was read before the failure.
    Partial {
        tree: CollectionTree,
        error: StoreError,
    },
}

impl CollectionExport {
    #[must_use]
    pub const fn tree(&self) -> &CollectionTree {
        match self {
            Self::Complete(tree) | Self::Partial { tree, .. } => tree,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Complete(_) => None,
            Self::Partial { error, .. } => Some(error),
        }
    }

    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }

    /// The tree as it is written to a backup, with `_error` set for partial reads.
    #[must_use]
    pub fn into_tree(self) -> CollectionTree {
        match self {
            Self::Complete(tree) => tree,
            Self::Partial { mut tree, error } => {
                tree.set_error(error.to_string());
                tree
            }
        }
    }
}

/// Options for a whole-database export.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub include_metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
        }
    }
}

/// Counts gathered while exporting a whole database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub collections: usize,
    /// Direct documents of root collections.
    pub documents: usize,
    /// Documents at any depth.
    pub nested_documents: usize,
    /// Collections (at any depth) whose read failed part-way.
    pub failed_collections: Vec<String>,
}

/// A whole-database export and its counts.
#[derive(Debug, Clone)]
pub struct DatabaseExport {
    pub artifact: DatabaseArtifact,
    pub summary: ExportSummary,
}

/// Walks a [`DocumentStore`] and produces backup trees.
pub struct Exporter<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    progress: &'a dyn Progress,
}

impl<'a, S: DocumentStore + ?Sized> Exporter<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            progress: &NoProgress,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Root collection names.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list collections.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.store.list_collections()?)
    }

    /// Export one collection and, recursively, every subcollection below it.
    ///
    /// Never fails: a stream error yields [`CollectionExport::Partial`].
    #[must_use]
    pub fn export_collection(&self, collection_path: &str) -> CollectionExport {
        self.progress.collection_started(collection_path);
        let mut tree = CollectionTree::new();
        match self.walk_collection(collection_path, &mut tree) {
            Ok(count) => {
                info!("Backed up {count} documents from collection: {collection_path}");
                CollectionExport::Complete(tree)
            }
            Err(error) => {
                warn!("Error backing up collection {collection_path}: {error}");
                CollectionExport::Partial { tree, error }
            }
        }
    }

    fn walk_collection(
        &self,
        collection_path: &str,
        tree: &mut CollectionTree,
    ) -> std::result::Result<usize, StoreError> {
        let mut count = 0;
        for snapshot in self.store.stream_documents(collection_path)? {
            let snapshot = snapshot?;
            let document_path = child_path(collection_path, &snapshot.id);

            let mut node = DocumentNode {
                id: snapshot.id.clone(),
                data: serde_json::Value::Object(encode_fields(&snapshot.fields)),
                create_time: snapshot.create_time.map(|t| t.to_iso_string()),
                update_time: snapshot.update_time.map(|t| t.to_iso_string()),
                subcollections: BTreeMap::new(),
            };

            for name in self.store.list_subcollections(&document_path)? {
                let sub_path = child_path(&document_path, &name);
                debug!("Backing up subcollection: {sub_path}");
                node.subcollections
                    .insert(name, self.export_collection(&sub_path).into_tree());
            }

            if tree.insert_document(snapshot.id.as_str(), node).is_err() {
                warn!("Skipping document with reserved ID: {document_path}");
                continue;
            }
            count += 1;
            self.progress.document_done(collection_path);
        }
        Ok(count)
    }

    /// Export every root collection.
    ///
    /// `total_documents` in the metadata counts direct documents of root
    /// collections only; `total_documents_nested` counts every level.
    ///
    /// # Errors
    ///
    /// Returns an error if the root collections cannot be listed. Failures
    /// inside a collection are recorded in the tree instead.
    pub fn export_database(&self, options: ExportOptions) -> Result<DatabaseExport> {
        let backup_time = backup_timestamp();
        let mut collections = BTreeMap::new();
        let mut summary = ExportSummary::default();

        for name in self.list_collections()? {
            info!("Backing up collection: {name}");
            let tree = self.export_collection(&name).into_tree();

            summary.collections += 1;
            summary.documents += tree.document_count();
            summary.nested_documents += tree.nested_document_count();
            summary.failed_collections.extend(tree.error_paths(&name));
            collections.insert(name, tree);
        }

        let metadata = options.include_metadata.then(|| BackupMetadata {
            backup_time,
            project_id: self.store.project_id().to_string(),
            backup_version: BACKUP_VERSION.to_string(),
            total_collections: summary.collections,
            total_documents: summary.documents,
            total_documents_nested: Some(summary.nested_documents),
        });

        Ok(DatabaseExport {
            artifact: DatabaseArtifact {
                metadata,
                collections,
            },
            summary,
        })
    }

    /// Export a single root collection without metadata aggregation.
    #[must_use]
    pub fn export_one_collection(&self, name: &str) -> CollectionArtifact {
        CollectionArtifact {
            collection_name: name.to_string(),
            backup_time: backup_timestamp(),
            data: self.export_collection(name).into_tree(),
        }
    }
}
