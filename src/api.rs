use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
    extract::{Path, State},
    Json,
    http::{Method, StatusCode},
};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatOrchestrator;
use crate::error::AdvisorError;
use crate::models::{
    ChatRequest, ChatResponse, PreferenceRequest, PreferenceResponse, PreferenceSnapshot,
    PreferencesResponse, RecommendationRequest, RecommendationResult,
};
use crate::preferences::{PreferenceStore, COCKTAILS, INGREDIENTS};
use crate::proxy::LanguageModel;
use crate::rag::DocumentStore;
use crate::recommend::Recommender;

type ApiError = (StatusCode, String);

pub struct AppState {
    store: Option<Arc<dyn DocumentStore>>,
    llm: Arc<dyn LanguageModel>,
    preferences: Arc<PreferenceStore>,
    recommender: Recommender,
    chat: ChatOrchestrator,
}

impl AppState {
    /// Wires every component to the one store handle created at startup.
    pub fn new(
        store: Option<Arc<dyn DocumentStore>>,
        llm: Arc<dyn LanguageModel>,
        default_model: String,
        context_top_k: u64,
    ) -> Self {
        let preferences = Arc::new(PreferenceStore::new(store.clone()));
        let recommender = Recommender::new(store.clone(), preferences.clone());
        let chat = ChatOrchestrator::new(
            store.clone(),
            llm.clone(),
            preferences.clone(),
            default_model,
            context_top_k,
        );

        Self {
            store,
            llm,
            preferences,
            recommender,
            chat,
        }
    }
}

fn api_error(context: &str) -> impl Fn(AdvisorError) -> ApiError + '_ {
    move |e| {
        tracing::error!("{} error: {}", context, e);
        (e.status_code(), format!("{} error: {}", context, e))
    }
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/chat", post(chat_handler))
        .route("/preferences", get(list_ingredients_handler).post(store_preferences_handler))
        .route("/preferences/:preference_type", get(get_preferences_handler))
        .route("/debug/preferences", get(debug_preferences_handler))
        .route("/recommend", post(recommend_handler))
        .route("/health", get(health_check));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to Cocktail Advisor API" }))
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let history = request.chat_history.unwrap_or_default();

    let answer = state
        .chat
        .ask(&request.query, &history, request.model.as_deref())
        .await
        .map_err(api_error("Chat"))?;

    Ok(Json(ChatResponse { answer }))
}

async fn list_ingredients_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let preferences = state
        .preferences
        .retrieve(INGREDIENTS)
        .await
        .map_err(api_error("Fetching preferences"))?;

    Ok(Json(PreferencesResponse { preferences }))
}

async fn store_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreferenceRequest>,
) -> Result<Json<PreferenceResponse>, ApiError> {
    let stored_preferences = state
        .preferences
        .store(&request.preference_type, &request.content)
        .await
        .map_err(api_error("Storing preferences"))?;

    Ok(Json(PreferenceResponse {
        status: "success".to_string(),
        stored_preferences,
    }))
}

async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
    Path(preference_type): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let preferences = state
        .preferences
        .retrieve(&preference_type)
        .await
        .map_err(api_error("Fetching preferences"))?;

    Ok(Json(preferences))
}

async fn debug_preferences_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PreferenceSnapshot>, ApiError> {
    let snapshot = state
        .preferences
        .snapshot(&[INGREDIENTS, COCKTAILS])
        .await
        .map_err(api_error("Fetching preferences"))?;

    Ok(Json(snapshot))
}

async fn recommend_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let result = state
        .recommender
        .recommend(&request.criteria, request.count)
        .await
        .map_err(api_error("Recommending cocktails"))?;

    Ok(Json(result))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_healthy = match state.store {
        Some(ref store) => store.health_check().await.unwrap_or(false),
        None => false,
    };
    let llm_healthy = state.llm.health_check().await.unwrap_or(false);
    // Without a store every answer is the no-data reply.
    let status = if store_healthy { "healthy" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "document_store": store_healthy,
            "llm": llm_healthy
        }
    }))
}
