//! Typed errors for the handbook library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure kind. Rate limiting is its own variant at every layer
//! because the indexer backs off on it and gives up on anything else.

use thiserror::Error;

/// Top-level error for handbook operations.
#[derive(Debug, Error)]
pub enum HandbookError {
    /// Crawl operation failed
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    /// Vector store rejected or failed a request
    #[error("vector store error: {0}")]
    Store(#[from] StoreError),

    /// Language or embedding model failed
    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    /// Conversation graph could not advance
    #[error("conversation error: {0}")]
    Engine(#[from] EngineError),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl HandbookError {
    /// True when the failure came from an upstream quota (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Store(e) => e.is_rate_limited(),
            Self::Ai(e) => e.is_rate_limited(),
            _ => false,
        }
    }
}

/// Errors that can occur while fetching or parsing a crawl target.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status code
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// PDF body could not be decoded
    #[error("unreadable PDF at {url}: {reason}")]
    Pdf { url: String, reason: String },

    /// Connection timeout
    #[error("timeout crawling: {url}")]
    Timeout { url: String },
}

/// Errors raised by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend returned HTTP 429
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Backend returned another non-success status
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Query vector has the wrong length
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Errors raised by language and embedding models.
#[derive(Debug, Error)]
pub enum AiError {
    /// Provider returned HTTP 429
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Provider request failed
    #[error("request failed: {0}")]
    Request(String),

    /// Provider returned nothing usable
    #[error("empty response from model")]
    EmptyResponse,
}

impl AiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Errors raised while driving the conversation graph.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The model requested a tool that is not bound
    #[error("unknown tool requested: {name}")]
    UnknownTool { name: String },

    /// Tool arguments did not match the tool's schema
    #[error("invalid arguments for {name}: {reason}")]
    InvalidToolArguments { name: String, reason: String },

    /// GENERATE was reached without a preceding tool turn
    #[error("no retrieval results to generate from")]
    MissingToolResult,
}

/// Result type alias for handbook operations.
pub type Result<T> = std::result::Result<T, HandbookError>;

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for vector store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for model operations.
pub type AiResult<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection_crosses_layers() {
        let store: HandbookError = StoreError::RateLimited("slow down".into()).into();
        let ai: HandbookError = AiError::RateLimited("quota".into()).into();
        let other: HandbookError = StoreError::Backend {
            status: 500,
            message: "boom".into(),
        }
        .into();

        assert!(store.is_rate_limited());
        assert!(ai.is_rate_limited());
        assert!(!other.is_rate_limited());
        assert!(!HandbookError::Config("x".into()).is_rate_limited());
    }
}
