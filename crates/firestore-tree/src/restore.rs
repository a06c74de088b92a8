//! Restore: replay a backup artifact into a store using bounded batches.
//!
//! Each document is decoded and queued as a full overwrite. The batch is
//! committed when it reaches the batch size; a document's subcollections are
//! restored right after that document is queued, so a child batch can commit
//! before the batch holding its parent. Whatever is still pending at the end
//! of a collection is committed.
//!
//! A document that cannot be prepared (malformed entry, invalid ID, payload
//! that cannot be decoded) is skipped and reported. A failed commit aborts the
//! run; batches committed before it stay applied.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::artifact::{CollectionTree, DatabaseArtifact};
use crate::codec::{TimestampMode, decode_document_data};
use crate::error::{BackupError, DocumentWriteError, Result, StoreError};
use crate::model::{child_path, split_path};
use crate::progress::{NoProgress, Progress};
use crate::store::{DocumentStore, MAX_BATCH_WRITES, WriteBatch};

/// Writes per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = MAX_BATCH_WRITES;

/// Options for a whole-database restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Count what would be restored without writing anything.
    pub dry_run: bool,
    /// Restore only these root collections (exact name match). `None` or an
    /// empty list restores everything.
    pub collections: Option<Vec<String>>,
    pub batch_size: usize,
    pub timestamp_mode: TimestampMode,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            collections: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timestamp_mode: TimestampMode::ServerTime,
        }
    }
}

/// A document (or subtree) left out of the restore because it could not be
/// prepared for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: String,
    pub reason: DocumentWriteError,
}

/// Join `segment` onto `parent`, requiring it to add exactly one path segment.
///
/// # Errors
///
/// Returns `InvalidPath` if `segment` is empty or contains `/`.
pub fn nested_path(
    parent: &str,
    segment: &str,
) -> std::result::Result<String, DocumentWriteError> {
    let path = child_path(parent, segment);
    let expected = if parent.is_empty() {
        1
    } else {
        parent.split('/').count() + 1
    };
    let reason = match split_path(&path) {
        Ok(segments) if segments.len() == expected => return Ok(path),
        Ok(_) => "ID must not contain '/'".to_string(),
        Err(StoreError::InvalidPath { reason, .. }) => reason,
        Err(other) => other.to_string(),
    };
    Err(DocumentWriteError::InvalidPath { path, reason })
}

/// What a restore did (or, for a dry run, would do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub dry_run: bool,
    /// Documents queued per root collection (direct documents only).
    pub collections: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedDocument>,
    /// Batch commits issued.
    pub commits: usize,
}

impl RestoreReport {
    /// Sum of the per-collection counts.
    #[must_use]
    pub fn total_documents(&self) -> usize {
        self.collections.values().sum()
    }
}

/// Root collections selected by an allow-list.
#[must_use]
pub fn select_collections<'a>(
    artifact: &'a DatabaseArtifact,
    filter: Option<&[String]>,
) -> Vec<(&'a String, &'a CollectionTree)> {
    artifact
        .collections
        .iter()
        .filter(|(name, _)| match filter {
            Some(names) if !names.is_empty() => names.iter().any(|n| n == *name),
            _ => true,
        })
        .collect()
}

/// Count what a restore would write, without touching a store.
#[must_use]
pub fn plan(artifact: &DatabaseArtifact, filter: Option<&[String]>) -> RestoreReport {
    let collections = select_collections(artifact, filter)
        .into_iter()
        .map(|(name, tree)| {
            let count = tree.document_count();
            info!("[DRY RUN] Would restore {count} documents to collection: {name}");
            (name.clone(), count)
        })
        .collect();
    RestoreReport {
        dry_run: true,
        collections,
        ..RestoreReport::default()
    }
}

/// Replays backup trees into a [`DocumentStore`].
pub struct Restorer<'a, S: DocumentStore + ?Sized> {
    store: &'a mut S,
    batch_size: usize,
    timestamp_mode: TimestampMode,
    progress: &'a dyn Progress,
    skipped: Vec<SkippedDocument>,
    commits: usize,
}

impl<'a, S: DocumentStore + ?Sized> Restorer<'a, S> {
    /// Create a restorer writing batches of at most `batch_size` documents.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBatchSize` unless `1 <= batch_size <= MAX_BATCH_WRITES`.
    pub fn new(store: &'a mut S, batch_size: usize) -> Result<Self> {
        if !(1..=MAX_BATCH_WRITES).contains(&batch_size) {
            return Err(BackupError::InvalidBatchSize {
                size: batch_size,
                max: MAX_BATCH_WRITES,
            });
        }
        Ok(Self {
            store,
            batch_size,
            timestamp_mode: TimestampMode::ServerTime,
            progress: &NoProgress,
            skipped: Vec::new(),
            commits: 0,
        })
    }

    #[must_use]
    pub fn with_timestamp_mode(mut self, mode: TimestampMode) -> Self {
        self.timestamp_mode = mode;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Documents skipped so far.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }

    fn skip(&mut self, path: String, reason: DocumentWriteError) {
        warn!("Error restoring document {path}: {reason}");
        self.skipped.push(SkippedDocument { path, reason });
    }

    /// Restore one collection tree at `collection_path`, recursing into subcollections.
    ///
    /// Returns the number of direct documents whose writes were queued.
    ///
    /// # Errors
    ///
    /// Returns `CommitAborted` if a batch commit fails, here or in any subcollection.
    pub fn restore_collection(
        &mut self,
        tree: &CollectionTree,
        collection_path: &str,
    ) -> Result<usize> {
        self.progress.collection_started(collection_path);
        let mut batch = WriteBatch::new();
        let mut restored = 0;

        for (doc_id, entry) in tree.malformed_documents() {
            let reason = DocumentWriteError::MalformedEntry(entry.reason.clone());
            self.skip(child_path(collection_path, doc_id), reason);
        }

        for (doc_id, node) in tree.documents() {
            let document_path = match nested_path(collection_path, doc_id) {
                Ok(path) => path,
                Err(reason) => {
                    self.skip(child_path(collection_path, doc_id), reason);
                    continue;
                }
            };
            let fields = match decode_document_data(&node.data, self.timestamp_mode) {
                Ok(fields) => fields,
                Err(reason) => {
                    self.skip(document_path, reason.into());
                    continue;
                }
            };

            batch.set(document_path.as_str(), fields);
            restored += 1;
            self.progress.document_done(collection_path);

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, collection_path, restored)?;
                info!("Restored {restored} documents to {collection_path}");
            }

            for (name, sub) in &node.subcollections {
                let sub_path = match nested_path(&document_path, name) {
                    Ok(path) => path,
                    Err(reason) => {
                        self.skip(child_path(&document_path, name), reason);
                        continue;
                    }
                };
                let count = self.restore_collection(sub, &sub_path)?;
                debug!("Restored {count} documents to subcollection: {sub_path}");
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, collection_path, restored)?;
        }

        Ok(restored)
    }

    fn flush(&mut self, batch: &mut WriteBatch, collection_path: &str, queued: usize) -> Result<()> {
        let pending = std::mem::take(batch);
        let writes = pending.len();
        self.store
            .commit(pending)
            .map_err(|source| BackupError::CommitAborted {
                collection: collection_path.to_string(),
                queued,
                source,
            })?;
        self.commits += 1;
        self.progress.batch_committed(collection_path, writes);
        Ok(())
    }

    /// Restore (or, with `dry_run`, only count) the selected root collections,
    /// one after another.
    ///
    /// # Errors
    ///
    /// Returns `CommitAborted` on the first failed commit; collections restored
    /// before it stay applied.
    pub fn restore_database(
        &mut self,
        artifact: &DatabaseArtifact,
        options: &RestoreOptions,
    ) -> Result<RestoreReport> {
        if options.dry_run {
            return Ok(plan(artifact, options.collections.as_deref()));
        }

        let mut collections = BTreeMap::new();
        for (name, tree) in select_collections(artifact, options.collections.as_deref()) {
            if let Err(reason) = nested_path("", name) {
                self.skip(name.clone(), reason);
                continue;
            }
            info!("Restoring collection: {name}");
            let count = self.restore_collection(tree, name)?;
            info!("Restored {count} documents to collection: {name}");
            collections.insert(name.clone(), count);
        }

        Ok(RestoreReport {
            dry_run: false,
            collections,
            skipped: self.skipped.clone(),
            commits: self.commits,
        })
    }
}

/// Restore an artifact with the given options.
///
/// # Errors
///
/// Returns `InvalidBatchSize` for a bad batch size, or `CommitAborted` if a commit fails.
pub fn restore_database<S: DocumentStore + ?Sized>(
    store: &mut S,
    artifact: &DatabaseArtifact,
    options: &RestoreOptions,
) -> Result<RestoreReport> {
    Restorer::new(store, options.batch_size)?
        .with_timestamp_mode(options.timestamp_mode)
        .restore_database(artifact, options)
}
