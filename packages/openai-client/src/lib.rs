//! OpenAI REST client
//!
//! A minimal client for chat completions (with function calling) and
//! embeddings. No domain logic lives here.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client
//!     .chat_completion(ChatRequest::new("gpt-4o-mini").message(Message::user("Is overtime paid after 44 hours?")))
//!     .await?;
//!
//! let vectors = client
//!     .create_embeddings(&["first", "second"], "text-embedding-3-small")
//!     .await?;
//! ```

pub mod error;
pub mod tool;
pub mod types;

pub use error::{OpenAIError, Result};
pub use tool::{FunctionCall, ToolCall, ToolDefinition};
pub use types::*;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Point at a compatible endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %error_text, path, "OpenAI API error");
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OpenAIError::RateLimited(error_text));
        }
        Err(OpenAIError::Api {
            status: status.as_u16(),
            message: error_text,
        })
    }

    /// Chat completion.
    ///
    /// Returns the first choice. Either `content`, `tool_calls`, or both
    /// may be present depending on whether tools were bound.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self.post("chat/completions", &request).await?;
        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let message = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| OpenAIError::Parse("No choices in response".into()))?;

        debug!(
            model = %request.model,
            tool_calls = message.tool_calls.len(),
            duration_ms = start.elapsed().as_millis(),
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content: message.content,
            tool_calls: message.tool_calls,
            usage: raw.usage,
        })
    }

    /// Create embedding for a single text.
    pub async fn create_embedding(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.create_embeddings(&[text], model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Parse("No embedding in response".into()))
    }

    /// Create embeddings for multiple texts in one request.
    ///
    /// Output order matches input order.
    pub async fn create_embeddings(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = types::EmbeddingRequest { model, input: texts };
        let response = self.post("embeddings", &request).await?;
        let mut parsed: types::EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(OpenAIError::Parse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test").with_base_url("https://custom.api.com/");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url(), "https://custom.api.com");
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_skips_request() {
        let client = OpenAIClient::new("sk-test").with_base_url("http://127.0.0.1:9");
        let vectors = client
            .create_embeddings(&[], "text-embedding-3-small")
            .await
            .unwrap();
        assert!(vectors.is_empty());
    }
}
