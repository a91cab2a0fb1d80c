use anyhow::Result;
use serde::Deserialize;

type ConfigBuilder = ::config::builder::ConfigBuilder<::config::builder::DefaultState>;

/// Which [`DocumentStore`](crate::rag::DocumentStore) the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Qdrant,
    /// In-process store, optionally seeded from `dataset_path` at startup.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub store: StoreBackend,
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_model_dir: String,
    pub vector_size: u64,
    #[serde(default)]
    pub dataset_path: Option<String>,
    pub llm_url: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,
    pub default_model: String,
    pub context_top_k: u64,
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Defaults, then an optional `cocktail-advisor.{toml,yaml,json}` in the working
    /// directory, then `COCKTAIL_*` environment variables.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Self::defaults()?
            .add_source(::config::File::with_name("cocktail-advisor").required(false))
            .add_source(::config::Environment::with_prefix("COCKTAIL").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    fn defaults() -> Result<ConfigBuilder> {
        Ok(::config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("store", "qdrant")?
            .set_default("qdrant_url", "http://localhost:6334")?
            .set_default("collection", "cocktails")?
            .set_default("embedding_model_dir", "/app/models/bge-small-en-v1.5")?
            .set_default("vector_size", 384)?
            .set_default("llm_url", "http://localhost:4000")?
            .set_default("default_model", "gpt-3.5-turbo")?
            .set_default("context_top_k", 4)?
            .set_default("request_timeout_secs", 60)?)
    }
}
