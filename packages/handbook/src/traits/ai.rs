//! Language and embedding model traits.
//!
//! Both are black boxes: the crate only relies on the reply shape
//! (prose and/or tool calls) and on embeddings being comparable.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AiResult;
use crate::types::conversation::{ModelReply, Turn};

/// A tool the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Plain completion over the given turns.
    async fn invoke(&self, messages: &[Turn]) -> AiResult<ModelReply>;

    /// Completion with tools bound; the reply may request calls.
    async fn invoke_with_tools(&self, messages: &[Turn], tools: &[ToolSpec]) -> AiResult<ModelReply>;
}

/// Text embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AiResult<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[&str]) -> AiResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
