//! The store capability the walkers run against, and an in-memory implementation.
//!
//! [`DocumentStore`] is the narrow surface of a document database client:
//! list root collections, stream a collection, list a document's
//! subcollections, commit a batch of writes. [`InMemoryStore`] implements it
//! over a nested map and can be persisted to a JSON datastore file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::{DocumentSnapshot, Fields, Timestamp, split_path};

/// Maximum number of writes the store accepts in one batch commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// Documents of one collection, in a stream that may fail part-way.
pub type DocumentStream<'a> = Box<dyn Iterator<Item = Result<DocumentSnapshot, StoreError>> + 'a>;

/// Access to a hierarchical document database.
pub trait DocumentStore {
    /// Project the store is connected to.
    fn project_id(&self) -> &str;

    /// Names of the root collections.
    ///
    /// # Errors
    ///
    /// Returns `ListCollections` if the listing fails.
    fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Stream the documents of the collection at `collection_path`.
    ///
    /// A missing collection is an empty stream.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the stream cannot be opened; items may also fail.
    fn stream_documents(&self, collection_path: &str) -> Result<DocumentStream<'_>, StoreError>;

    /// Names of the subcollections under the document at `document_path`.
    ///
    /// # Errors
    ///
    /// Returns `ListSubcollections` if the listing fails.
    fn list_subcollections(&self, document_path: &str) -> Result<Vec<String>, StoreError>;

    /// Apply every write in the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns `BatchTooLarge`, `InvalidPath`, or `Commit`; nothing is applied on error.
    fn commit(&mut self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;
}

/// A full-document overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub path: String,
    pub fields: Fields,
}

/// Pending writes committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<DocumentWrite>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a "set": create the document or replace all of its fields.
    pub fn set(&mut self, path: impl Into<String>, fields: Fields) {
        self.writes.push(DocumentWrite {
            path: path.into(),
            fields,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    #[must_use]
    pub fn writes(&self) -> &[DocumentWrite] {
        &self.writes
    }

    #[must_use]
    pub fn into_writes(self) -> Vec<DocumentWrite> {
        self.writes
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub commit_time: Timestamp,
    pub write_count: usize,
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredDocument {
    /// `None` for a document that only exists as a parent of subcollections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    create_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    subcollections: BTreeMap<String, StoredCollection>,
}

impl StoredDocument {
    fn has_content(&self) -> bool {
        self.fields.is_some() || self.subcollections.values().any(StoredCollection::has_content)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct StoredCollection {
    documents: BTreeMap<String, StoredDocument>,
}

impl StoredCollection {
    fn has_content(&self) -> bool {
        self.documents.values().any(StoredDocument::has_content)
    }

    fn count_documents(&self) -> usize {
        self.documents
            .values()
            .map(|doc| {
                usize::from(doc.fields.is_some())
                    + doc
                        .subcollections
                        .values()
                        .map(Self::count_documents)
                        .sum::<usize>()
            })
            .sum()
    }
}

#[derive(Debug, Deserialize)]
struct DatastoreFile {
    project_id: String,
    #[serde(default)]
    collections: BTreeMap<String, StoredCollection>,
}

#[derive(Serialize)]
struct DatastoreFileRef<'a> {
    project_id: &'a str,
    collections: &'a BTreeMap<String, StoredCollection>,
}

/// In-memory document store.
///
/// Use `open()` to load from a datastore file; once opened from a file every
/// successful commit is written back to it.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    project_id: String,
    collections: BTreeMap<String, StoredCollection>,
    path: Option<PathBuf>,
}

impl InMemoryStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new empty store.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            collections: BTreeMap::new(),
            path: None,
        }
    }

    /// Open a datastore file, starting empty if it does not exist yet.
    ///
    /// The store takes `project_id`; a different project recorded in the file
    /// is logged and replaced on the next save.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, or `Json` if it cannot be parsed.
    pub fn open(path: impl AsRef<Path>, project_id: impl Into<String>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let project_id = project_id.into();

        let collections = match fs::read_to_string(path) {
            Ok(text) => {
                let file: DatastoreFile = serde_json::from_str(&text)?;
                if file.project_id != project_id {
                    tracing::warn!(
                        "Datastore {} belongs to project '{}', opening as '{}'",
                        path.display(),
                        file.project_id,
                        project_id
                    );
                }
                file.collections
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Datastore {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            project_id,
            collections,
            path: Some(path.to_path_buf()),
        })
    }

    /// Save to the file that was opened.
    ///
    /// # Errors
    ///
    /// Returns `Commit` if no file path is set, or `Io` on write failure.
    pub fn save(&self) -> Result<(), StoreError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| StoreError::Commit("No datastore path set; use save_to()".to_string()))?;
        self.save_to(path)
    }

    /// Save to a specific file path (write-to-temp + rename).
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` on failure.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        write_datastore(path.as_ref(), &self.project_id, &self.collections)
    }

    // ========================================================================
    // Direct access
    // ========================================================================

    /// Write one document immediately, outside any batch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if `path` is not a document path.
    pub fn set_document(&mut self, path: &str, fields: Fields) -> Result<Timestamp, StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(path, fields);
        self.commit(batch).map(|receipt| receipt.commit_time)
    }

    /// Read one document; virtual (field-less) documents read as `None`.
    #[must_use]
    pub fn get_document(&self, path: &str) -> Option<DocumentSnapshot> {
        let segments = document_segments(path).ok()?;
        let (id, collection) = segments.split_last()?;
        let doc = self.find_collection(collection)?.documents.get(*id)?;
        snapshot(id, doc)
    }

    /// Number of real documents at any depth.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.collections
            .values()
            .map(StoredCollection::count_documents)
            .sum()
    }

    fn find_collection(&self, segments: &[&str]) -> Option<&StoredCollection> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.collections.get(*first)?;
        for pair in rest.chunks(2) {
            let doc = current.documents.get(pair[0])?;
            current = doc.subcollections.get(*pair.get(1)?)?;
        }
        Some(current)
    }

}

fn document_entry<'a>(
    collections: &'a mut BTreeMap<String, StoredCollection>,
    first: &str,
    rest: &[&str],
    id: &str,
) -> &'a mut StoredDocument {
    let mut current = collections.entry(first.to_string()).or_default();
    for pair in rest.chunks(2) {
        let [doc_id, name] = pair else { break };
        current = current
            .documents
            .entry((*doc_id).to_string())
            .or_default()
            .subcollections
            .entry((*name).to_string())
            .or_default();
    }
    current.documents.entry(id.to_string()).or_default()
}

/// Write a datastore file (write-to-temp + rename).
fn write_datastore(
    path: &Path,
    project_id: &str,
    collections: &BTreeMap<String, StoredCollection>,
) -> Result<(), StoreError> {
    let file = DatastoreFileRef {
        project_id,
        collections,
    };
    let json = serde_json::to_string_pretty(&file)?;

    let tmp_path = path.with_extension("json.tmp");
    let mut out = fs::File::create(&tmp_path)?;
    out.write_all(json.as_bytes())?;
    out.flush()?;
    drop(out);
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("local")
    }
}

impl DocumentStore for InMemoryStore {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .collections
            .iter()
            .filter(|(_, collection)| collection.has_content())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn stream_documents(&self, collection_path: &str) -> Result<DocumentStream<'_>, StoreError> {
        let segments = split_path(collection_path)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::invalid_path(
                collection_path,
                "expected a collection path",
            ));
        }
        let Some(collection) = self.find_collection(&segments) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let snapshots: Vec<_> = collection
            .documents
            .iter()
            .filter_map(|(id, doc)| snapshot(id, doc))
            .map(Ok)
            .collect();
        Ok(Box::new(snapshots.into_iter()))
    }

    fn list_subcollections(&self, document_path: &str) -> Result<Vec<String>, StoreError> {
        let segments = document_segments(document_path)?;
        let Some((id, collection)) = segments.split_last() else {
            return Ok(Vec::new());
        };
        Ok(self
            .find_collection(collection)
            .and_then(|c| c.documents.get(*id))
            .map(|doc| {
                doc.subcollections
                    .iter()
                    .filter(|(_, sub)| sub.has_content())
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                count: batch.len(),
                max: MAX_BATCH_WRITES,
            });
        }
        // Validate every path before touching anything.
        for write in batch.writes() {
            document_segments(&write.path)?;
        }

        // Stage on a copy; it replaces the live state only once persisted.
        let mut staged = self.collections.clone();
        let commit_time = Timestamp::now();
        let write_count = batch.len();
        for write in batch.into_writes() {
            let segments = document_segments(&write.path)?;
            let [first, rest @ .., id] = segments.as_slice() else {
                return Err(StoreError::invalid_path(&write.path, "expected a document path"));
            };
            let fields: Fields = write
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.resolve_server_timestamps(commit_time)))
                .collect();

            let doc = document_entry(&mut staged, first, rest, id);
            if doc.fields.is_none() {
                doc.create_time = Some(commit_time);
            }
            doc.fields = Some(fields);
            doc.update_time = Some(commit_time);
        }

        if let Some(path) = &self.path {
            write_datastore(path, &self.project_id, &staged)?;
        }
        self.collections = staged;

        tracing::trace!(writes = write_count, "Committed batch");
        Ok(CommitReceipt {
            commit_time,
            write_count,
        })
    }
}

fn document_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments = split_path(path)?;
    if segments.len() % 2 != 0 {
        return Err(StoreError::invalid_path(path, "expected a document path"));
    }
    Ok(segments)
}

fn snapshot(id: &str, doc: &StoredDocument) -> Option<DocumentSnapshot> {
    doc.fields.as_ref().map(|fields| DocumentSnapshot {
        id: id.to_string(),
        fields: fields.clone(),
        create_time: doc.create_time,
        update_time: doc.update_time,
    })
}
