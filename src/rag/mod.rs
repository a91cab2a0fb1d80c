pub mod embeddings;
pub mod memory_store;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod failing_store;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

pub use self::memory_store::InMemoryDocumentStore;
pub use self::vector_store::QdrantDocumentStore;

pub const SOURCE_KEY: &str = "source";
pub const COCKTAIL_SOURCE: &str = "cocktails_dataset";
pub const PREFERENCE_SOURCE: &str = "user_preference";

/// A stored record: free text plus string-valued metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Equality match on a single metadata field.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn eq(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn cocktails() -> Self {
        Self::eq(SOURCE_KEY, COCKTAIL_SOURCE)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.meta(&self.key) == Some(self.value.as_str())
    }
}

/// Document storage with similarity search. Embedding is the store's concern.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores documents; a document without an id gets a fresh one. Writing an
    /// existing id replaces that record.
    async fn add(&self, documents: Vec<Document>) -> Result<()>;

    /// All documents whose metadata matches `filter`.
    async fn get(&self, filter: &MetadataFilter) -> Result<Vec<Document>>;

    /// Removes all documents whose metadata matches `filter`.
    async fn delete(&self, filter: &MetadataFilter) -> Result<()>;

    /// Up to `k` documents ranked by similarity to `query`, optionally restricted by `filter`.
    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>>;

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
