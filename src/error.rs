use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("document store not available")]
    StoreUnavailable,

    #[error("document store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("language model error: {0}")]
    LanguageModel(#[source] anyhow::Error),
}

impl AdvisorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::LanguageModel(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
