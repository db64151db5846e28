//! OpenAI implementation of the model traits.
//!
//! ```rust,ignore
//! use handbook::ai::OpenAI;
//!
//! let ai = OpenAI::from_env()?.with_model("gpt-4o-mini");
//! let engine = ConversationEngine::new(ai.clone(), index, history);
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError, ToolDefinition};
use tracing::debug;

use crate::error::{AiError, AiResult, HandbookError, Result};
use crate::traits::ai::{ChatModel, Embedder, ToolSpec};
use crate::types::conversation::{ModelReply, Role, ToolCall, Turn};

/// OpenAI-backed chat and embedding model.
#[derive(Clone)]
pub struct OpenAI {
    client: OpenAIClient,
    model: String,
    embedding_model: String,
    temperature: Option<f32>,
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_client(OpenAIClient::new(api_key))
    }

    pub fn from_client(client: OpenAIClient) -> Self {
        Self {
            client,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: None,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let client = OpenAIClient::from_env().map_err(|e| HandbookError::Config(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model (default: text-embedding-3-small).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Turn], tools: &[ToolSpec]) -> AiResult<ModelReply> {
        let mut request = ChatRequest::new(&self.model).messages(messages.iter().map(to_message).collect());
        if let Some(t) = self.temperature {
            request = request.temperature(t);
        }
        for tool in tools {
            request = request.tool(&ToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            });
        }

        let response = self.client.chat_completion(request).await.map_err(to_ai_error)?;
        debug!(
            model = %self.model,
            tool_calls = response.tool_calls.len(),
            "Chat completion"
        );

        Ok(ModelReply {
            content: response.content.unwrap_or_default(),
            tool_calls: response.tool_calls.into_iter().map(from_tool_call).collect(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAI {
    async fn invoke(&self, messages: &[Turn]) -> AiResult<ModelReply> {
        self.complete(messages, &[]).await
    }

    async fn invoke_with_tools(&self, messages: &[Turn], tools: &[ToolSpec]) -> AiResult<ModelReply> {
        self.complete(messages, tools).await
    }
}

#[async_trait]
impl Embedder for OpenAI {
    async fn embed(&self, text: &str) -> AiResult<Vec<f32>> {
        self.client
            .create_embedding(text, &self.embedding_model)
            .await
            .map_err(to_ai_error)
    }

    async fn embed_batch(&self, texts: &[&str]) -> AiResult<Vec<Vec<f32>>> {
        self.client
            .create_embeddings(texts, &self.embedding_model)
            .await
            .map_err(to_ai_error)
    }
}

fn to_ai_error(e: OpenAIError) -> AiError {
    if e.is_rate_limited() {
        AiError::RateLimited(e.to_string())
    } else {
        AiError::Request(e.to_string())
    }
}

fn to_message(turn: &Turn) -> Message {
    match turn.role {
        Role::Human => Message::user(&turn.content),
        Role::System => Message::system(&turn.content),
        Role::Ai if !turn.tool_calls.is_empty() => Message::assistant_tool_calls(
            (!turn.content.is_empty()).then(|| turn.content.clone()),
            turn.tool_calls.iter().map(to_tool_call).collect(),
        ),
        Role::Ai => Message::assistant(&turn.content),
        Role::Tool => Message::tool(turn.tool_call_id.clone().unwrap_or_default(), &turn.content),
    }
}

fn to_tool_call(call: &ToolCall) -> openai_client::ToolCall {
    openai_client::ToolCall::new(&call.id, &call.name, call.arguments.to_string())
}

/// Arguments arrive as a JSON string; unparseable text is kept as a string
/// value so the engine reports it as invalid arguments.
fn from_tool_call(call: openai_client::ToolCall) -> ToolCall {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or(serde_json::Value::String(call.function.arguments));
    ToolCall::new(call.id, call.function.name, arguments)
}
