//! Text-level similarity search.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::document::Document;

/// Search a namespace by query text.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Up to `k` documents from `namespace`, most similar first.
    async fn similarity_search(&self, query: &str, namespace: &str, k: usize) -> Result<Vec<Document>>;
}
