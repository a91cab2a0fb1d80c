use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::models::{CompletionRequest, CompletionResponse, Message};

/// Text completion over a list of chat messages.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String>;

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Client for an OpenAI-compatible chat completions endpoint (LiteLLM, OpenAI).
pub struct LlmProxy {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmProxy {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn chat_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("LLM request failed: {} - {}", status, error_text);
        }

        let chat_response: CompletionResponse = response.json().await?;
        Ok(chat_response)
    }
}

#[async_trait]
impl LanguageModel for LlmProxy {
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages,
            temperature: None,
            max_tokens: None,
        };

        let response = self.chat_completion(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("LLM response contained no choices"))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health/liveliness", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
