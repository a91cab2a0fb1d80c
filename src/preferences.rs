//! Per-category preference lists kept as single documents in the document store.
//!
//! The store has no field-level update, so a merge reads the current record,
//! deletes it and writes the union back. Writers in other processes can
//! interleave between the delete and the insert. The two steps are not
//! atomic either: if the insert fails after the delete succeeded, the
//! category's preferences are gone and the error is returned without a retry.
//!
//! Items are joined with the ASCII unit separator; input items containing
//! control characters are rejected, so the delimiter never appears inside an
//! item.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{AdvisorError, Result};
use crate::models::PreferenceSnapshot;
use crate::rag::{Document, DocumentStore, MetadataFilter, PREFERENCE_SOURCE, SOURCE_KEY};

pub const INGREDIENTS: &str = "ingredients";
pub const COCKTAILS: &str = "cocktails";

const TYPE_KEY: &str = "preference_type";
const CONTENT_KEY: &str = "content_str";
const DELIMITER: char = '\u{1f}';

pub fn encode(items: &[String]) -> String {
    items.join(&DELIMITER.to_string())
}

pub fn decode(encoded: &str) -> Vec<String> {
    encoded
        .split(DELIMITER)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trims each item and rejects the ones that cannot be stored.
fn normalize(items: &[String]) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                return Err(AdvisorError::validation("preference items must not be empty"));
            }
            if item.chars().any(char::is_control) {
                return Err(AdvisorError::validation(format!(
                    "preference item {:?} contains control characters",
                    item
                )));
            }
            Ok(item.to_string())
        })
        .collect()
}

/// Existing items first, then new ones in first-seen order; exact-match dedup.
fn merge(existing: Vec<String>, new_items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .chain(new_items)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

pub struct PreferenceStore {
    store: Option<Arc<dyn DocumentStore>>,
    // Serialises merges in this process. Writers in other processes can still
    // interleave between our delete and insert.
    write_lock: Mutex<()>,
}

impl PreferenceStore {
    pub fn new(store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn filter(preference_type: &str) -> MetadataFilter {
        MetadataFilter::eq(TYPE_KEY, preference_type)
    }

    async fn records(store: &dyn DocumentStore, preference_type: &str) -> Result<Vec<Document>> {
        store
            .get(&Self::filter(preference_type))
            .await
            .map_err(AdvisorError::Store)
    }

    /// Items across all records for the type. There is normally exactly one.
    fn items_of(records: &[Document]) -> Vec<String> {
        let decoded = records
            .iter()
            .filter_map(|doc| doc.meta(CONTENT_KEY))
            .flat_map(decode)
            .collect();
        merge(decoded, Vec::new())
    }

    /// Merges `items` into the record for `preference_type` and returns the stored list.
    pub async fn store(&self, preference_type: &str, items: &[String]) -> Result<Vec<String>> {
        let preference_type = preference_type.trim();
        if preference_type.is_empty() {
            return Err(AdvisorError::validation("preference_type must not be empty"));
        }
        let items = normalize(items)?;
        let store = self.store.as_deref().ok_or(AdvisorError::StoreUnavailable)?;

        let _guard = self.write_lock.lock().await;

        let existing = Self::records(store, preference_type).await?;
        let merged = merge(Self::items_of(&existing), items);

        if !existing.is_empty() {
            store
                .delete(&Self::filter(preference_type))
                .await
                .map_err(AdvisorError::Store)?;
        }

        let record = Document::new(format!(
            "User preference - {}: {}",
            preference_type,
            merged.join(", ")
        ))
        .with_metadata(TYPE_KEY, preference_type)
        .with_metadata(CONTENT_KEY, encode(&merged))
        .with_metadata(SOURCE_KEY, PREFERENCE_SOURCE);

        store.add(vec![record]).await.map_err(AdvisorError::Store)?;

        tracing::info!(
            preference_type,
            count = merged.len(),
            "Stored user preferences"
        );
        Ok(merged)
    }

    pub async fn retrieve(&self, preference_type: &str) -> Result<Vec<String>> {
        match self.store.as_deref() {
            Some(store) => {
                let records = Self::records(store, preference_type.trim()).await?;
                Ok(Self::items_of(&records))
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn snapshot(&self, preference_types: &[&str]) -> Result<PreferenceSnapshot> {
        let mut snapshot = PreferenceSnapshot::new();
        for preference_type in preference_types {
            snapshot.insert(preference_type.to_string(), self.retrieve(preference_type).await?);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::failing_store::{FailingStore, Operation};
    use crate::rag::InMemoryDocumentStore;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sorted(mut items: Vec<String>) -> Vec<String> {
        items.sort();
        items
    }

    fn preference_store() -> (InMemoryDocumentStore, PreferenceStore) {
        let backing = InMemoryDocumentStore::new();
        let store = PreferenceStore::new(Some(Arc::new(backing.clone())));
        (backing, store)
    }

    /// Backing store already holding `rum` under `ingredients`, behind a store
    /// that fails `failing`.
    async fn failing_preference_store(
        failing: &[Operation],
    ) -> (InMemoryDocumentStore, PreferenceStore) {
        let (backing, seeded) = preference_store();
        seeded.store(INGREDIENTS, &strings(&["rum"])).await.unwrap();
        let store = PreferenceStore::new(Some(Arc::new(FailingStore::wrapping(
            backing.clone(),
            failing,
        ))));
        (backing, store)
    }

    #[test]
    fn test_encode_decode() {
        let items = strings(&["vodka", "lemon, lime", "orange juice"]);
        assert_eq!(decode(&encode(&items)), items);
        assert!(decode("").is_empty());
    }

    #[test]
    fn test_merge_keeps_order_and_dedups() {
        let merged = merge(strings(&["vodka", "lemon"]), strings(&["lemon", "mint", "mint"]));
        assert_eq!(merged, strings(&["vodka", "lemon", "mint"]));
    }

    #[test]
    fn test_merge_is_case_sensitive() {
        let merged = merge(strings(&["Gin"]), strings(&["gin"]));
        assert_eq!(merged, strings(&["Gin", "gin"]));
    }

    #[tokio::test]
    async fn test_union_regardless_of_order() {
        let (_, first) = preference_store();
        first.store(INGREDIENTS, &strings(&["vodka", "lemon"])).await.unwrap();
        first.store(INGREDIENTS, &strings(&["lemon", "mint"])).await.unwrap();

        let (_, second) = preference_store();
        second.store(INGREDIENTS, &strings(&["lemon", "mint"])).await.unwrap();
        second.store(INGREDIENTS, &strings(&["vodka", "lemon"])).await.unwrap();

        let expected = strings(&["lemon", "mint", "vodka"]);
        assert_eq!(sorted(first.retrieve(INGREDIENTS).await.unwrap()), expected);
        assert_eq!(sorted(second.retrieve(INGREDIENTS).await.unwrap()), expected);
    }

    #[tokio::test]
    async fn test_single_record_per_type() {
        let (backing, store) = preference_store();
        store.store(INGREDIENTS, &strings(&["rum"])).await.unwrap();
        store.store(INGREDIENTS, &strings(&["gin"])).await.unwrap();
        store.store(COCKTAILS, &strings(&["Negroni"])).await.unwrap();
        store.store(INGREDIENTS, &strings(&["rum", "tonic"])).await.unwrap();

        let records = backing
            .get(&MetadataFilter::eq(TYPE_KEY, INGREDIENTS))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].meta(SOURCE_KEY), Some(PREFERENCE_SOURCE));
        assert_eq!(backing.len().await, 2);
    }

    #[tokio::test]
    async fn test_missing_type_is_empty() {
        let (_, store) = preference_store();
        assert!(store.retrieve("garnishes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_invalid_items() {
        let (backing, store) = preference_store();
        let err = store.store(INGREDIENTS, &strings(&["rum", "  "])).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));

        let err = store
            .store(INGREDIENTS, &strings(&["gin\u{1f}tonic"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));

        let err = store.store("", &strings(&["rum"])).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));

        assert!(backing.is_empty().await);
    }

    #[tokio::test]
    async fn test_items_with_commas_survive() {
        let (_, store) = preference_store();
        store.store(COCKTAILS, &strings(&["Gin, Tonic"])).await.unwrap();
        assert_eq!(store.retrieve(COCKTAILS).await.unwrap(), strings(&["Gin, Tonic"]));
    }

    #[tokio::test]
    async fn test_malformed_record_reads_as_empty() {
        let (backing, store) = preference_store();
        backing
            .add(vec![Document::new("User preference - ingredients: ")
                .with_metadata(TYPE_KEY, INGREDIENTS)
                .with_metadata(CONTENT_KEY, "")])
            .await
            .unwrap();
        assert!(store.retrieve(INGREDIENTS).await.unwrap().is_empty());

        store.store(INGREDIENTS, &strings(&["mint"])).await.unwrap();
        assert_eq!(backing.len().await, 1);
        assert_eq!(store.retrieve(INGREDIENTS).await.unwrap(), strings(&["mint"]));
    }

    #[tokio::test]
    async fn test_no_backing_store() {
        let store = PreferenceStore::new(None);
        assert!(store.retrieve(INGREDIENTS).await.unwrap().is_empty());

        let err = store.store(INGREDIENTS, &strings(&["rum"])).await.unwrap_err();
        assert!(matches!(err, AdvisorError::StoreUnavailable));
    }

    #[tokio::test]
    async fn test_retrieve_failure_is_store_error() {
        let (_, store) = failing_preference_store(&[Operation::Get]).await;

        let err = store.retrieve(INGREDIENTS).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Store(_)));
        let err = store.snapshot(&[INGREDIENTS, COCKTAILS]).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Store(_)));
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_previous_record() {
        let (backing, store) = failing_preference_store(&[Operation::Delete]).await;

        let err = store.store(INGREDIENTS, &strings(&["gin"])).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Store(_)));

        assert_eq!(backing.len().await, 1);
        let reader = PreferenceStore::new(Some(Arc::new(backing)));
        assert_eq!(reader.retrieve(INGREDIENTS).await.unwrap(), strings(&["rum"]));
    }

    #[tokio::test]
    async fn test_insert_failure_after_delete_loses_category() {
        let (backing, store) = failing_preference_store(&[Operation::Add]).await;

        let err = store.store(INGREDIENTS, &strings(&["gin"])).await.unwrap_err();
        assert!(matches!(err, AdvisorError::Store(_)));

        assert!(backing.is_empty().await);
        let reader = PreferenceStore::new(Some(Arc::new(backing)));
        assert!(reader.retrieve(INGREDIENTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (_, store) = preference_store();
        store.store(INGREDIENTS, &strings(&["rum"])).await.unwrap();

        let snapshot = store.snapshot(&[INGREDIENTS, COCKTAILS]).await.unwrap();
        assert_eq!(snapshot[INGREDIENTS], strings(&["rum"]));
        assert!(snapshot[COCKTAILS].is_empty());
    }
}
