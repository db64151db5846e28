use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub pinecone_api_key: String,
    pub pinecone_index_host: String,
    pub crawl_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            chat_model: env::var("CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            pinecone_api_key: env::var("PINECONE_API_KEY")
                .context("PINECONE_API_KEY must be set")?,
            pinecone_index_host: env::var("PINECONE_INDEX_HOST")
                .context("PINECONE_INDEX_HOST must be set")?,
            crawl_requests_per_second: env::var("CRAWL_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("CRAWL_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }
}
