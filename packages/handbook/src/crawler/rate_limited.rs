//! Rate-limited fetcher wrapper.
//!
//! Wraps any Fetcher with a governor quota so a crawl never exceeds a
//! fixed request rate against the target site.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use url::Url;

use crate::error::CrawlResult;
use crate::traits::fetcher::{FetchedResource, Fetcher};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher that waits for a permit before every request.
pub struct RateLimitedFetcher<F: Fetcher> {
    inner: F,
    limiter: Arc<DirectRateLimiter>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Allow at most `requests_per_second` fetches. Zero is treated as one.
    pub fn new(fetcher: F, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(fetcher, Quota::per_second(rate))
    }

    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &Url) -> CrawlResult<FetchedResource> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }
}

/// Extension trait for easy rate limiting.
pub trait FetcherExt: Fetcher + Sized {
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedFetcher<Self> {
        RateLimitedFetcher::new(self, requests_per_second)
    }
}

impl<F: Fetcher + Sized> FetcherExt for F {}
