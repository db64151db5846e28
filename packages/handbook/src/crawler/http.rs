//! reqwest-backed fetcher.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::error::{CrawlError, CrawlResult};
use crate::traits::fetcher::{FetchedResource, Fetcher};
use crate::types::config::CrawlConfig;

/// Plain HTTP fetcher with a browser User-Agent and a per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> CrawlResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| CrawlError::Http(Box::new(e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> CrawlResult<FetchedResource> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                CrawlError::Timeout { url: url.to_string() }
            } else {
                CrawlError::Http(Box::new(e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        debug!(url = %url, content_type = ?content_type, bytes = body.len(), "Fetched");

        Ok(FetchedResource {
            url: final_url,
            content_type,
            body: body.to_vec(),
        })
    }
}
