//! Store wrapper that injects failures and records commits.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use firestore_tree::store::{CommitReceipt, DocumentStream};
use firestore_tree::{DocumentStore, InMemoryStore, StoreError, WriteBatch};

#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    /// Collection path -> number of documents yielded before the stream fails.
    pub fail_stream_after: HashMap<String, usize>,
    /// Document paths whose subcollection listing fails.
    pub fail_subcollections: HashSet<String>,
    /// Zero-based commit attempt that is rejected.
    pub fail_commit_at: Option<usize>,
    /// Paths written by each successful commit, in commit order.
    pub committed: Vec<Vec<String>>,
    pub commit_attempts: usize,
}

impl FaultyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn written_paths(&self) -> Vec<String> {
        self.committed.iter().flatten().cloned().collect()
    }
}

impl DocumentStore for FaultyStore {
    fn project_id(&self) -> &str {
        self.inner.project_id()
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_collections()
    }

    fn stream_documents(&self, collection_path: &str) -> Result<DocumentStream<'_>, StoreError> {
        let stream = self.inner.stream_documents(collection_path)?;
        match self.fail_stream_after.get(collection_path) {
            Some(&after) => {
                let failure = StoreError::read(collection_path, "stream reset by peer");
                Ok(Box::new(stream.take(after).chain(std::iter::once(Err(failure)))))
            }
            None => Ok(stream),
        }
    }

    fn list_subcollections(&self, document_path: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_subcollections.contains(document_path) {
            return Err(StoreError::ListSubcollections {
                path: document_path.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        self.inner.list_subcollections(document_path)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        let attempt = self.commit_attempts;
        self.commit_attempts += 1;
        if self.fail_commit_at == Some(attempt) {
            return Err(StoreError::Commit("service unavailable".to_string()));
        }
        let paths = batch.writes().iter().map(|w| w.path.clone()).collect();
        let receipt = self.inner.commit(batch)?;
        self.committed.push(paths);
        Ok(receipt)
    }
}
