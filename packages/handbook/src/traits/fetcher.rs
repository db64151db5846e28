//! Fetching crawl targets.

use async_trait::async_trait;
use url::Url;

use crate::error::CrawlResult;

/// Body and declared type of a fetched URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResource {
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn new(url: Url, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Classified by the declared content type, never by URL suffix.
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
    }
}

/// Retrieves raw resources for the crawler.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> CrawlResult<FetchedResource>;
}
