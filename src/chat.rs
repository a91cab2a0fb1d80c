//! Retrieval-augmented answering plus preference capture from user messages.

use std::sync::Arc;

use crate::error::{AdvisorError, Result};
use crate::models::{ChatTurn, Message};
use crate::preferences::{PreferenceStore, INGREDIENTS};
use crate::proxy::LanguageModel;
use crate::rag::{DocumentStore, MetadataFilter};

pub const NO_DATA_ANSWER: &str = "No cocktail data available. Please load the dataset first.";

const SYSTEM_PROMPT: &str = "You are a cocktail expert and advisor. Use the provided context to answer questions about cocktails.
If the information is not in the context, say you don't have that information.
If the user mentions their favorite ingredients, remember them for future recommendations.

Context: {context}";

const PREFERENCE_KEYWORDS: [&str; 6] = ["favorite", "favourite", "love", "like", "prefer", "enjoy"];

const KNOWN_INGREDIENTS: [&str; 23] = [
    "rum", "vodka", "gin", "tequila", "whiskey", "bourbon",
    "brandy", "cognac", "lime", "lemon", "orange", "mint",
    "sugar", "syrup", "juice", "soda", "tonic", "vermouth",
    "bitters", "grenadine", "cream", "coffee", "chocolate",
];

/// Ingredients the user says they like.
///
/// Plain case-insensitive substring matching: "I don't like gin" yields `gin`,
/// and "ginger" also matches `gin`.
pub fn detect_preferences(query: &str) -> Vec<&'static str> {
    let query = query.to_lowercase();
    if !PREFERENCE_KEYWORDS.iter().any(|keyword| query.contains(keyword)) {
        return Vec::new();
    }

    KNOWN_INGREDIENTS
        .iter()
        .copied()
        .filter(|ingredient| query.contains(ingredient))
        .collect()
}

fn wire_role(role: &str) -> Option<&'static str> {
    match role.to_lowercase().as_str() {
        "user" | "human" => Some("user"),
        "assistant" | "ai" => Some("assistant"),
        "system" => Some("system"),
        _ => None,
    }
}

pub struct ChatOrchestrator {
    store: Option<Arc<dyn DocumentStore>>,
    llm: Arc<dyn LanguageModel>,
    preferences: Arc<PreferenceStore>,
    default_model: String,
    top_k: u64,
}

impl ChatOrchestrator {
    pub fn new(
        store: Option<Arc<dyn DocumentStore>>,
        llm: Arc<dyn LanguageModel>,
        preferences: Arc<PreferenceStore>,
        default_model: String,
        top_k: u64,
    ) -> Self {
        Self {
            store,
            llm,
            preferences,
            default_model,
            top_k,
        }
    }

    pub fn build_messages(context: &str, history: &[ChatTurn], query: &str) -> Vec<Message> {
        let mut messages = vec![Message::new("system", SYSTEM_PROMPT.replace("{context}", context))];

        for turn in history {
            match wire_role(&turn.role) {
                Some(role) => messages.push(Message::new(role, turn.content.clone())),
                None => tracing::debug!(role = %turn.role, "Skipping history turn with unknown role"),
            }
        }

        messages.push(Message::new("user", query));
        messages
    }

    pub async fn ask(&self, query: &str, history: &[ChatTurn], model: Option<&str>) -> Result<String> {
        let Some(store) = self.store.as_deref() else {
            return Ok(NO_DATA_ANSWER.to_string());
        };

        let documents = store
            .similarity_search(query, self.top_k, Some(&MetadataFilter::cocktails()))
            .await
            .map_err(AdvisorError::Store)?;
        if documents.is_empty() {
            tracing::info!("No cocktail documents retrieved, skipping LLM call");
            return Ok(NO_DATA_ANSWER.to_string());
        }

        let context = documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = Self::build_messages(&context, history, query);
        let model = model.unwrap_or(self.default_model.as_str());

        let answer = self
            .llm
            .complete(model, messages)
            .await
            .map_err(AdvisorError::LanguageModel)?;

        self.capture_preferences(query).await;

        Ok(answer)
    }

    async fn capture_preferences(&self, query: &str) {
        let found = detect_preferences(query);
        if found.is_empty() {
            return;
        }

        tracing::debug!(ingredients = ?found, "Preference keywords detected");
        let items: Vec<String> = found.iter().map(|s| s.to_string()).collect();
        if let Err(e) = self.preferences.store(INGREDIENTS, &items).await {
            tracing::warn!("Failed to store detected preferences: {}", e);
        }
    }
}
