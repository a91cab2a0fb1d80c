use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use cocktail_advisor::api::{self, AppState};
use cocktail_advisor::config::{Settings, StoreBackend};
use cocktail_advisor::indexer::load_cocktails;
use cocktail_advisor::proxy::{LanguageModel, LlmProxy};
use cocktail_advisor::rag::embeddings::EmbeddingGenerator;
use cocktail_advisor::rag::{DocumentStore, InMemoryDocumentStore, QdrantDocumentStore};

async fn connect_store(settings: &Settings) -> Result<Arc<dyn DocumentStore>> {
    match settings.store {
        StoreBackend::Qdrant => {
            tracing::info!("Connecting to Qdrant: {}", settings.qdrant_url);
            let embeddings = EmbeddingGenerator::new(&settings.embedding_model_dir).await?;
            let store = QdrantDocumentStore::new(
                &settings.qdrant_url,
                &settings.collection,
                settings.vector_size,
                embeddings,
            )
            .await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = InMemoryDocumentStore::new();
            if let Some(path) = &settings.dataset_path {
                let documents = load_cocktails(Path::new(path))?
                    .into_iter()
                    .map(|record| record.into_document())
                    .collect::<Vec<_>>();
                tracing::info!(count = documents.len(), "Loading cocktails into memory from {}", path);
                store.add(documents).await?;
            } else {
                tracing::warn!("In-memory store has no dataset_path, starting empty");
            }
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;

    tracing::info!("Connecting to LLM endpoint: {}", settings.llm_url);

    let store: Option<Arc<dyn DocumentStore>> = match connect_store(&settings).await {
        Ok(store) => {
            tracing::info!(backend = ?settings.store, "Document store initialized successfully");
            Some(store)
        }
        Err(e) => {
            tracing::warn!("Document store initialization failed (continuing without data): {}", e);
            None
        }
    };

    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let llm: Arc<dyn LanguageModel> = Arc::new(LlmProxy::new(
        settings.llm_url.clone(),
        settings.llm_api_key.clone(),
        timeout,
    )?);

    let state = Arc::new(AppState::new(
        store,
        llm,
        settings.default_model.clone(),
        settings.context_top_k,
    ));

    let app = api::router(state, timeout);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Cocktail advisor listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
