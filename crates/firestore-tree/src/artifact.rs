//! Backup artifact layout and file I/O.
//!
//! A whole-database backup looks like:
//!
//! ```json
//! {
//!   "metadata": { "backup_time": "...", "project_id": "...", "backup_version": "1.0",
//!                 "total_collections": 1, "total_documents": 2 },
//!   "collections": {
//!     "users": {
//!       "u1": { "id": "u1", "data": {...}, "create_time": "...", "update_time": "...",
//!               "subcollections": { "orders": { ... } } },
//!       "_error": "present only if reading the collection failed part-way"
//!     }
//!   }
//! }
//! ```
//!
//! Inside a collection, keys starting with `_` are annotations, never document IDs.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::ArtifactError;
use crate::model::child_path;

/// Format version written into `metadata.backup_version`.
pub const BACKUP_VERSION: &str = "1.0";

/// Prefix marking annotation keys inside a collection.
pub const RESERVED_PREFIX: char = '_';

/// Annotation key recording a collection read failure.
pub const ERROR_KEY: &str = "_error";

/// True for keys that are annotations rather than document IDs.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Local wall-clock time in the format stored in `backup_time`.
#[must_use]
pub fn backup_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

// ============================================================================
// Tree
// ============================================================================

/// One exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(default)]
    pub id: String,
    /// Encoded field payload (normally an object).
    #[serde(default = "empty_object")]
    pub data: JsonValue,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub subcollections: BTreeMap<String, CollectionTree>,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Map::new())
}

impl Default for DocumentNode {
    fn default() -> Self {
        Self {
            id: String::new(),
            data: empty_object(),
            create_time: None,
            update_time: None,
            subcollections: BTreeMap::new(),
        }
    }
}

impl DocumentNode {
    /// Count this document and everything nested below it.
    #[must_use]
    pub fn nested_document_count(&self) -> usize {
        1 + self
            .subcollections
            .values()
            .map(CollectionTree::nested_document_count)
            .sum::<usize>()
    }
}

/// A document entry that does not have the document layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedDocument {
    /// The entry exactly as it appears in the file.
    pub raw: JsonValue,
    pub reason: String,
}

/// Documents of one collection keyed by ID, plus reserved-key annotations.
///
/// On the wire both live in the same JSON object; they are separated on load
/// so annotation keys can never be mistaken for documents. Entries that are
/// not document objects are kept apart as [`MalformedDocument`]s so one bad
/// entry does not reject the whole backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, JsonValue>", into = "Map<String, JsonValue>")]
pub struct CollectionTree {
    documents: BTreeMap<String, DocumentNode>,
    malformed: BTreeMap<String, MalformedDocument>,
    annotations: BTreeMap<String, JsonValue>,
}

impl CollectionTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. Annotation keys are rejected and the node is returned.
    ///
    /// # Errors
    ///
    /// Returns the node back if `id` starts with the reserved prefix.
    pub fn insert_document(
        &mut self,
        id: impl Into<String>,
        node: DocumentNode,
    ) -> Result<(), DocumentNode> {
        let id = id.into();
        if is_reserved_key(&id) {
            return Err(node);
        }
        self.documents.insert(id, node);
        Ok(())
    }

    #[must_use]
    pub fn document(&self, id: &str) -> Option<&DocumentNode> {
        self.documents.get(id)
    }

    /// Iterate documents, never annotations.
    pub fn documents(&self) -> impl Iterator<Item = (&String, &DocumentNode)> {
        self.documents.iter()
    }

    /// Entries that could not be read as documents.
    pub fn malformed_documents(&self) -> impl Iterator<Item = (&String, &MalformedDocument)> {
        self.malformed.iter()
    }

    /// Number of direct document entries, malformed ones included
    /// (annotations excluded).
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len() + self.malformed.len()
    }

    /// Number of documents in this collection and all its subcollections.
    #[must_use]
    pub fn nested_document_count(&self) -> usize {
        self.malformed.len()
            + self
                .documents
                .values()
                .map(DocumentNode::nested_document_count)
                .sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.malformed.is_empty() && self.annotations.is_empty()
    }

    /// The recorded read failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.annotations.get(ERROR_KEY).and_then(JsonValue::as_str)
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.annotations
            .insert(ERROR_KEY.to_string(), JsonValue::String(message.into()));
    }

    #[must_use]
    pub const fn annotations(&self) -> &BTreeMap<String, JsonValue> {
        &self.annotations
    }

    /// Paths of every collection in this subtree carrying an `_error` marker.
    #[must_use]
    pub fn error_paths(&self, path: &str) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_error_paths(path, &mut paths);
        paths
    }

    fn collect_error_paths(&self, path: &str, out: &mut Vec<String>) {
        if self.error().is_some() {
            out.push(path.to_string());
        }
        for (id, node) in &self.documents {
            let document_path = child_path(path, id);
            for (name, sub) in &node.subcollections {
                sub.collect_error_paths(&child_path(&document_path, name), out);
            }
        }
    }
}

impl TryFrom<Map<String, JsonValue>> for CollectionTree {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, JsonValue>) -> Result<Self, Self::Error> {
        let mut tree = Self::new();
        for (key, value) in map {
            if is_reserved_key(&key) {
                tree.annotations.insert(key, value);
            } else {
                match DocumentNode::deserialize(&value) {
                    Ok(node) => {
                        tree.documents.insert(key, node);
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        tree.malformed.insert(key, MalformedDocument { raw: value, reason });
                    }
                }
            }
        }
        Ok(tree)
    }
}

impl From<CollectionTree> for Map<String, JsonValue> {
    fn from(tree: CollectionTree) -> Self {
        let mut map = Self::new();
        for (id, node) in tree.documents {
            // DocumentNode holds only JSON-representable fields.
            let value = serde_json::to_value(node).unwrap_or(JsonValue::Null);
            map.insert(id, value);
        }
        map.extend(tree.malformed.into_iter().map(|(id, entry)| (id, entry.raw)));
        map.extend(tree.annotations);
        map
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Run-level information written alongside a whole-database backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupMetadata {
    pub backup_time: String,
    pub project_id: String,
    pub backup_version: String,
    pub total_collections: usize,
    /// Direct documents of root collections only; nested documents are not counted.
    pub total_documents: usize,
    /// Every document in the backup, at any depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_documents_nested: Option<usize>,
}

/// Whole-database backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackupMetadata>,
    pub collections: BTreeMap<String, CollectionTree>,
}

/// Single-collection backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionArtifact {
    pub collection_name: String,
    pub backup_time: String,
    pub data: CollectionTree,
}

/// Parse a whole-database artifact from JSON text.
///
/// # Errors
///
/// Returns `Parse` for invalid JSON, `MissingCollections` if the top-level
/// object has no `collections` key, or `Shape` for any other layout problem.
pub fn parse_database(text: &str) -> Result<DatabaseArtifact, ArtifactError> {
    let json: JsonValue = serde_json::from_str(text)?;
    let JsonValue::Object(root) = &json else {
        return Err(ArtifactError::Shape(
            "top-level value must be an object".to_string(),
        ));
    };
    if !root.contains_key("collections") {
        return Err(ArtifactError::MissingCollections);
    }
    serde_json::from_value(json).map_err(|e| ArtifactError::Shape(e.to_string()))
}

/// Read and parse a whole-database artifact.
///
/// The whole file is loaded into memory before anything is returned.
///
/// # Errors
///
/// Returns `Read` if the file cannot be read, otherwise as [`parse_database`].
pub fn load_database(path: &Path) -> Result<DatabaseArtifact, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_database(&text)
}

/// Write any artifact as pretty JSON (2-space indent, UTF-8, non-ASCII kept).
///
/// Uses write-to-temp + rename. Returns the size of the written file in bytes.
///
/// # Errors
///
/// Returns an error if serialization or any file operation fails.
pub fn write_pretty<T: Serialize>(path: &Path, artifact: &T) -> std::io::Result<u64> {
    let json = serde_json::to_string_pretty(artifact)?;

    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(fs::metadata(path)?.len())
}
