//! In-memory document store with CouchDB-style revisions

use super::{doc_id, doc_rev, BulkDocResult, DocWriteResponse, DocumentStore, REV_FIELD};
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const CONFLICT: &str = "conflict";
const CONFLICT_REASON: &str = "Document update conflict.";

/// In-memory document store
///
/// Clones share the same underlying documents.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    docs: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Next revision string after `current`
    fn next_rev(current: Option<&str>) -> String {
        let generation = current
            .and_then(|rev| rev.split('-').next())
            .and_then(|gen| gen.parse::<u64>().ok())
            .unwrap_or(0);
        format!("{}-{}", generation + 1, Uuid::new_v4().simple())
    }

    /// Apply one write against the locked document map
    ///
    /// Returns the new revision, or `None` on a revision conflict.
    fn write_locked(docs: &mut BTreeMap<String, Value>, id: &str, mut doc: Value) -> Option<String> {
        let supplied = doc_rev(&doc).map(str::to_string);
        let current = docs.get(id).and_then(doc_rev).map(str::to_string);

        if supplied != current {
            return None;
        }

        let rev = Self::next_rev(current.as_deref());
        if let Some(obj) = doc.as_object_mut() {
            obj.insert(REV_FIELD.to_string(), Value::String(rev.clone()));
        }
        docs.insert(id.to_string(), doc);
        Some(rev)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn all_docs(&self, prefix: &str) -> Result<Vec<Value>> {
        let docs = self.docs.read().await;
        Ok(docs
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Value>> {
        let docs = self.docs.read().await;
        Ok(docs.get(id).cloned())
    }

    async fn put(&self, doc: Value) -> Result<DocWriteResponse> {
        let id = doc_id(&doc)
            .ok_or_else(|| AuthzError::Validation("Document is missing an _id".to_string()))?
            .to_string();

        let mut docs = self.docs.write().await;
        match Self::write_locked(&mut docs, &id, doc) {
            Some(rev) => Ok(DocWriteResponse { id, rev }),
            None => Err(AuthzError::Conflict(id)),
        }
    }

    async fn bulk_docs(&self, batch: Vec<Value>) -> Result<Vec<BulkDocResult>> {
        let mut docs = self.docs.write().await;
        let mut results = Vec::with_capacity(batch.len());

        for doc in batch {
            let Some(id) = doc_id(&doc).map(str::to_string) else {
                results.push(BulkDocResult::failed("", "bad_request", "Document is missing an _id"));
                continue;
            };
            match Self::write_locked(&mut docs, &id, doc) {
                Some(rev) => results.push(BulkDocResult::ok(id, rev)),
                None => results.push(BulkDocResult::failed(id, CONFLICT, CONFLICT_REASON)),
            }
        }

        Ok(results)
    }

    async fn remove(&self, id: &str, rev: &str) -> Result<()> {
        let mut docs = self.docs.write().await;
        let current = docs
            .get(id)
            .ok_or_else(|| AuthzError::NotFound(id.to_string()))?;

        if doc_rev(current) != Some(rev) {
            return Err(AuthzError::Conflict(id.to_string()));
        }

        docs.remove(id);
        Ok(())
    }
}
