//! Document store abstraction
//!
//! Roles are persisted as JSON documents in a CouchDB-style store: every
//! document carries an `_id` and a `_rev`, and writes are checked against the
//! current revision (optimistic concurrency). Bulk writes report success or
//! failure per document, so a batch may partially succeed.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod memory;

pub use memory::InMemoryDocumentStore;

/// Document id field
pub const ID_FIELD: &str = "_id";

/// Document revision field
pub const REV_FIELD: &str = "_rev";

/// Response of a single successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocWriteResponse {
    pub id: String,
    pub rev: String,
}

/// Per-document result of a bulk write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDocResult {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkDocResult {
    pub fn ok(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: Some(rev.into()),
            error: None,
            reason: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            error: Some(error.into()),
            reason: Some(reason.into()),
        }
    }
}

/// Document store trait
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document whose id starts with `prefix`, ordered by id
    async fn all_docs(&self, prefix: &str) -> Result<Vec<Value>>;

    /// Get a document by id
    async fn get(&self, id: &str) -> Result<Option<Value>>;

    /// Create or update a single document
    ///
    /// Updating requires the document's current `_rev`; creating requires
    /// that no `_rev` is supplied. Anything else is a conflict.
    async fn put(&self, doc: Value) -> Result<DocWriteResponse>;

    /// Write several documents, each checked independently
    async fn bulk_docs(&self, docs: Vec<Value>) -> Result<Vec<BulkDocResult>>;

    /// Delete a document at the given revision
    async fn remove(&self, id: &str, rev: &str) -> Result<()>;
}

/// Extract the `_id` of a document
pub fn doc_id(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Extract the `_rev` of a document
pub fn doc_rev(doc: &Value) -> Option<&str> {
    doc.get(REV_FIELD).and_then(Value::as_str)
}
