//! Testing utilities including mock implementations.
//!
//! These let applications exercise crawling, indexing and the conversation
//! engine without network access or real model calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use url::Url;

use crate::error::{AiError, AiResult, CrawlError, CrawlResult, Result, StoreError, StoreResult};
use crate::stores::MemoryVectorStore;
use crate::traits::{
    ai::{ChatModel, Embedder, ToolSpec},
    clock::Clock,
    fetcher::{FetchedResource, Fetcher},
    search::SearchIndex,
    store::{IndexStats, MetadataFilter, ScoredRecord, VectorRecord, VectorStore},
};
use crate::types::conversation::{ModelReply, Turn};
use crate::types::document::Document;

// =============================================================================
// Chat model
// =============================================================================

/// Record of a call made to [`MockChatModel`].
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub messages: Vec<Turn>,
    pub with_tools: bool,
    pub tools: Vec<String>,
}

/// A chat model that plays back scripted replies in order.
///
/// Once the script runs out every call fails with
/// [`AiError::EmptyResponse`].
#[derive(Default, Clone)]
pub struct MockChatModel {
    replies: Arc<RwLock<VecDeque<ModelReply>>>,
    calls: Arc<RwLock<Vec<ChatCall>>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next reply.
    pub fn with_reply(self, reply: ModelReply) -> Self {
        self.replies.write().unwrap().push_back(reply);
        self
    }

    pub fn push_reply(&self, reply: ModelReply) {
        self.replies.write().unwrap().push_back(reply);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.read().unwrap().len()
    }

    fn next(&self, messages: &[Turn], tools: Option<&[ToolSpec]>) -> AiResult<ModelReply> {
        self.calls.write().unwrap().push(ChatCall {
            messages: messages.to_vec(),
            with_tools: tools.is_some(),
            tools: tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.clone())
                .collect(),
        });
        self.replies
            .write()
            .unwrap()
            .pop_front()
            .ok_or(AiError::EmptyResponse)
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, messages: &[Turn]) -> AiResult<ModelReply> {
        self.next(messages, None)
    }

    async fn invoke_with_tools(&self, messages: &[Turn], tools: &[ToolSpec]) -> AiResult<ModelReply> {
        self.next(messages, Some(tools))
    }
}

// =============================================================================
// Embedder
// =============================================================================

/// Deterministic embedder: identical texts embed identically.
#[derive(Clone)]
pub struct MockEmbedder {
    dimension: usize,
    overrides: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dimension: 64,
            overrides: Arc::default(),
            calls: Arc::default(),
        }
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Fix the embedding returned for `text`.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.overrides.write().unwrap().insert(text.into(), embedding);
        self
    }

    /// Texts embedded so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Generate a deterministic embedding based on text.
    fn generate_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());
        (0..self.dimension)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> AiResult<Vec<f32>> {
        self.calls.write().unwrap().push(text.to_string());
        Ok(self
            .overrides
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.generate_deterministic_embedding(text)))
    }
}

// =============================================================================
// Fetcher
// =============================================================================

/// Serves canned responses by URL. Unknown URLs answer 404.
#[derive(Default, Clone)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
    redirects: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(url.to_string(), (content_type.to_string(), body.into()));
        self
    }

    pub fn with_html(self, url: &str, body: impl Into<String>) -> Self {
        self.with_response(url, "text/html; charset=utf-8", body.into().into_bytes())
    }

    pub fn with_pdf(self, url: &str, body: Vec<u8>) -> Self {
        self.with_response(url, "application/pdf", body)
    }

    /// Serve `to`'s response for `from`, reporting `to` as the final URL.
    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.redirects
            .write()
            .unwrap()
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Fetched URLs in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.read().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> CrawlResult<FetchedResource> {
        self.calls.write().unwrap().push(url.to_string());
        let final_url = match self.redirects.read().unwrap().get(url.as_str()) {
            Some(to) => Url::parse(to).map_err(|_| CrawlError::InvalidUrl { url: to.clone() })?,
            None => url.clone(),
        };
        let response = self.responses.read().unwrap().get(final_url.as_str()).cloned();
        match response {
            Some((content_type, body)) => Ok(FetchedResource::new(final_url, Some(&content_type), body)),
            None => Err(CrawlError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

// =============================================================================
// Search index
// =============================================================================

/// Record of a similarity search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub namespace: String,
    pub k: usize,
}

/// Returns the first `k` canned documents of a namespace.
#[derive(Default, Clone)]
pub struct MockSearchIndex {
    documents: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    searches: Arc<RwLock<Vec<SearchCall>>>,
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(self, namespace: &str, docs: Vec<Document>) -> Self {
        self.documents.write().unwrap().insert(namespace.to_string(), docs);
        self
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.searches.read().unwrap().clone()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn similarity_search(&self, query: &str, namespace: &str, k: usize) -> Result<Vec<Document>> {
        self.searches.write().unwrap().push(SearchCall {
            query: query.to_string(),
            namespace: namespace.to_string(),
            k,
        });
        Ok(self
            .documents
            .read()
            .unwrap()
            .get(namespace)
            .map(|docs| docs.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// Clock
// =============================================================================

/// A clock frozen at a settable instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.write().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

// =============================================================================
// Flaky store
// =============================================================================

/// Memory store whose first `n` upserts fail.
pub struct FlakyVectorStore {
    inner: MemoryVectorStore,
    failures: usize,
    rate_limited: bool,
    attempts: AtomicUsize,
}

impl FlakyVectorStore {
    /// First `n` upserts fail with HTTP 429.
    pub fn rate_limited(n: usize) -> Self {
        Self {
            inner: MemoryVectorStore::new(),
            failures: n,
            rate_limited: true,
            attempts: AtomicUsize::new(0),
        }
    }

    /// First `n` upserts fail with a server error.
    pub fn failing(n: usize) -> Self {
        Self {
            rate_limited: false,
            ..Self::rate_limited(n)
        }
    }

    pub fn upsert_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryVectorStore {
        &self.inner
    }

    pub async fn count(&self, namespace: &str) -> usize {
        self.inner.count(namespace).await
    }
}

#[async_trait]
impl VectorStore for FlakyVectorStore {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> StoreResult<usize> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(if self.rate_limited {
                StoreError::RateLimited("Rate limit exceeded".into())
            } else {
                StoreError::Backend {
                    status: 500,
                    message: "internal error".into(),
                }
            });
        }
        self.inner.upsert(namespace, records).await
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<ScoredRecord>> {
        self.inner.query(namespace, vector, top_k, filter).await
    }

    async fn delete(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<()> {
        self.inner.delete(namespace, filter).await
    }

    async fn stats(&self) -> StoreResult<IndexStats> {
        self.inner.stats().await
    }

    async fn scan(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<Vec<VectorRecord>> {
        self.inner.scan(namespace, filter).await
    }
}
