//! In-process [`DocumentStore`] for tests and for local runs without Qdrant
//! (`store = "memory"`, seeded from `dataset_path`).
//!
//! Similarity is the number of distinct query terms found in the document, so
//! ranking is deterministic; ties keep insertion order.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, DocumentStore, MetadataFilter};

#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn terms(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn score(query_terms: &HashSet<String>, doc: &Document) -> usize {
        let doc_terms = Self::terms(&doc.content);
        query_terms.intersection(&doc_terms).count()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add(&self, documents: Vec<Document>) -> Result<()> {
        let mut stored = self.documents.write().await;
        for mut doc in documents {
            let id = doc.id.get_or_insert_with(|| Uuid::new_v4().to_string()).clone();
            match stored.iter_mut().find(|d| d.id.as_deref() == Some(id.as_str())) {
                Some(existing) => *existing = doc,
                None => stored.push(doc),
            }
        }
        Ok(())
    }

    async fn get(&self, filter: &MetadataFilter) -> Result<Vec<Document>> {
        let stored = self.documents.read().await;
        Ok(stored.iter().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<()> {
        let mut stored = self.documents.write().await;
        stored.retain(|d| !filter.matches(d));
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>> {
        let query_terms = Self::terms(query);
        let stored = self.documents.read().await;

        let mut ranked: Vec<(usize, &Document)> = stored
            .iter()
            .filter(|d| filter.map_or(true, |f| f.matches(d)))
            .map(|d| (Self::score(&query_terms, d), d))
            .collect();
        // sort_by is stable, so equal scores stay in insertion order
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .take(k as usize)
            .map(|(_, d)| d.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::COCKTAIL_SOURCE;

    fn cocktail(name: &str, content: &str) -> Document {
        Document::new(content)
            .with_metadata("name", name)
            .with_metadata("source", COCKTAIL_SOURCE)
    }

    #[tokio::test]
    async fn test_add_assigns_ids_and_replaces_same_id() {
        let store = InMemoryDocumentStore::new();
        store.add(vec![Document::new("a"), Document::new("b").with_id("fixed")]).await.unwrap();
        assert_eq!(store.len().await, 2);

        store.add(vec![Document::new("c").with_id("fixed")]).await.unwrap();
        assert_eq!(store.len().await, 2);

        let all = store.similarity_search("", 10, None).await.unwrap();
        assert!(all.iter().all(|d| d.id.is_some()));
        assert!(all.iter().any(|d| d.content == "c"));
        assert!(!all.iter().any(|d| d.content == "b"));
    }

    #[tokio::test]
    async fn test_get_and_delete_by_filter() {
        let store = InMemoryDocumentStore::new();
        store
            .add(vec![
                Document::new("x").with_metadata("preference_type", "ingredients"),
                Document::new("y").with_metadata("preference_type", "cocktails"),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::eq("preference_type", "ingredients");
        assert_eq!(store.get(&filter).await.unwrap().len(), 1);

        store.delete(&filter).await.unwrap();
        assert!(store.get(&filter).await.unwrap().is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_similarity_search_ranks_by_term_overlap() {
        let store = InMemoryDocumentStore::new();
        store
            .add(vec![
                cocktail("Martini", "Cocktail: Martini\nIngredients: gin, dry vermouth"),
                cocktail("Mojito", "Cocktail: Mojito\nIngredients: rum, lime, mint, sugar"),
                cocktail("Daiquiri", "Cocktail: Daiquiri\nIngredients: rum, lime, sugar"),
            ])
            .await
            .unwrap();

        let results = store.similarity_search("rum with mint", 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].meta("name"), Some("Mojito"));
        assert_eq!(results[1].meta("name"), Some("Daiquiri"));
    }

    #[tokio::test]
    async fn test_similarity_search_respects_filter() {
        let store = InMemoryDocumentStore::new();
        store
            .add(vec![
                Document::new("User preference - ingredients: rum")
                    .with_metadata("source", "user_preference"),
                cocktail("Cuba Libre", "Cocktail: Cuba Libre\nIngredients: rum, cola, lime"),
            ])
            .await
            .unwrap();

        let results = store
            .similarity_search("rum", 5, Some(&MetadataFilter::cocktails()))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].meta("name"), Some("Cuba Libre"));
    }
}
