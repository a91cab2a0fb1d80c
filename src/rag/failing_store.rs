//! [`DocumentStore`] double that fails selected operations and passes the rest
//! through to an in-memory store.

use anyhow::Result;
use async_trait::async_trait;

use super::{Document, DocumentStore, InMemoryDocumentStore, MetadataFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Get,
    Delete,
    Search,
}

pub struct FailingStore {
    inner: InMemoryDocumentStore,
    failing: Vec<Operation>,
}

impl FailingStore {
    /// Fails `failing` and delegates everything else to `inner`.
    pub fn wrapping(inner: InMemoryDocumentStore, failing: &[Operation]) -> Self {
        Self {
            inner,
            failing: failing.to_vec(),
        }
    }

    fn check(&self, op: Operation) -> Result<()> {
        if self.failing.contains(&op) {
            anyhow::bail!("{:?} failed: connection reset", op);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn add(&self, documents: Vec<Document>) -> Result<()> {
        self.check(Operation::Add)?;
        self.inner.add(documents).await
    }

    async fn get(&self, filter: &MetadataFilter) -> Result<Vec<Document>> {
        self.check(Operation::Get)?;
        self.inner.get(filter).await
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<()> {
        self.check(Operation::Delete)?;
        self.inner.delete(filter).await
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        self.check(Operation::Search)?;
        self.inner.similarity_search(query, k, filter).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.failing.is_empty())
    }
}
