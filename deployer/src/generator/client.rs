//! OpenAI-compatible chat completions client

use std::time::Duration;

use async_trait::async_trait;
use openapi_client::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::errors::SitecastError;
use crate::generator::TextBackend;

/// Text backend options
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// API base URL, `/chat/completions` is appended
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Chat completions over HTTPS with a bearer token
pub struct ChatCompletionsClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl ChatCompletionsClient {
    /// Create a new client
    pub fn new(options: ChatOptions, api_key: SecretString) -> Result<Self, SitecastError> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            model: options.model,
            api_key,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextBackend for ChatCompletionsClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SitecastError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, self.model);

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        };

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| SitecastError::GenerationError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion failed: {} - {}", status, body);
            return Err(SitecastError::GenerationError(format!(
                "text backend returned {}",
                status
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SitecastError::GenerationError(format!("invalid response: {}", e)))?;

        match completion.first_content() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            Some(_) => Err(SitecastError::GenerationError(
                "text backend returned empty content".to_string(),
            )),
            None => Err(SitecastError::GenerationError(
                "text backend returned no choices".to_string(),
            )),
        }
    }
}
