use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AdvisorError, Result};
use crate::models::{Recommendation, RecommendationResult};
use crate::preferences::{PreferenceStore, INGREDIENTS};
use crate::rag::{Document, DocumentStore, MetadataFilter};

const FAVORITE_KEYWORDS: [&str; 2] = ["favorite", "favourite"];
const OVERFETCH_FACTOR: u64 = 3;
const UNKNOWN_NAME: &str = "Unknown cocktail";

pub const MAX_COUNT: usize = 100;

pub const NO_DATA_MESSAGE: &str = "No cocktail data available.";
pub const NO_FAVORITES_MESSAGE: &str =
    "No favorite ingredients found. Please tell me what ingredients you like first.";

pub fn wants_favorites(criteria: &str) -> bool {
    let criteria = criteria.to_lowercase();
    FAVORITE_KEYWORDS.iter().any(|keyword| criteria.contains(keyword))
}

/// First occurrence of each name wins; at most `count` entries.
pub fn dedup_by_name(documents: Vec<Document>, count: usize) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .map(|doc| Recommendation {
            name: doc.meta("name").unwrap_or(UNKNOWN_NAME).to_string(),
            ingredients: doc.meta("ingredients").unwrap_or_default().to_string(),
            content: doc.content,
        })
        .filter(|rec| seen.insert(rec.name.clone()))
        .take(count)
        .collect()
}

pub struct Recommender {
    store: Option<Arc<dyn DocumentStore>>,
    preferences: Arc<PreferenceStore>,
}

impl Recommender {
    pub fn new(store: Option<Arc<dyn DocumentStore>>, preferences: Arc<PreferenceStore>) -> Self {
        Self { store, preferences }
    }

    pub async fn recommend(&self, criteria: &str, count: usize) -> Result<RecommendationResult> {
        if count == 0 {
            return Err(AdvisorError::validation("count must be a positive integer"));
        }
        if count > MAX_COUNT {
            return Err(AdvisorError::validation(format!(
                "count must not exceed {}",
                MAX_COUNT
            )));
        }

        let Some(store) = self.store.as_deref() else {
            return Ok(RecommendationResult {
                recommendations: Vec::new(),
                message: NO_DATA_MESSAGE.to_string(),
            });
        };

        let search_query = if wants_favorites(criteria) {
            let favorites = self.preferences.retrieve(INGREDIENTS).await?;
            if favorites.is_empty() {
                return Ok(RecommendationResult {
                    recommendations: Vec::new(),
                    message: NO_FAVORITES_MESSAGE.to_string(),
                });
            }
            format!("cocktails with {}", favorites.join(", "))
        } else {
            criteria.to_string()
        };

        tracing::debug!(query = %search_query, count, "Searching cocktails");

        let documents = store
            .similarity_search(
                &search_query,
                (count as u64).saturating_mul(OVERFETCH_FACTOR),
                Some(&MetadataFilter::cocktails()),
            )
            .await
            .map_err(AdvisorError::Store)?;

        let recommendations = dedup_by_name(documents, count);
        let message = format!(
            "Here are {} cocktail recommendations based on {}",
            recommendations.len(),
            search_query
        );

        Ok(RecommendationResult { recommendations, message })
    }
}
