//! Configuration types for crawling, chunking, indexing, retrieval and mining.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Namespace holding jurisdiction-independent documents.
pub const GENERAL_NAMESPACE: &str = "General";

/// Namespace holding archived user questions.
pub const USER_QUESTIONS_NAMESPACE: &str = "UserQuestions";

/// Desktop browser identity sent with every crawl request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Configuration for a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Links deeper than this are not followed. Seed is depth 0.
    pub max_depth: usize,

    /// User-Agent header.
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Links whose path contains any of these are skipped.
    #[serde(default)]
    pub excluded_path_segments: Vec<String>,

    /// Link suffixes that are never followed (sitemaps).
    #[serde(default)]
    pub excluded_suffixes: Vec<String>,

    /// If non-empty, HTML pages mentioning none of these (case-insensitive)
    /// are dropped along with their links.
    #[serde(default)]
    pub relevance_keywords: Vec<String>,

    /// Optional fetch rate limit.
    pub requests_per_second: Option<u32>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            excluded_path_segments: vec!["/fr/".to_string()],
            excluded_suffixes: vec![".xml".to_string()],
            relevance_keywords: Vec::new(),
            requests_per_second: None,
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_relevance_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.relevance_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = Some(requests_per_second);
        self
    }

    /// Keywords used when crawling public employment-standards sites.
    pub fn employment_keywords() -> Vec<String> {
        [
            "employment",
            "labour",
            "wage",
            "overtime",
            "termination",
            "hours of work",
            "holiday",
            "statutory",
            "minimum wage",
            "layoff",
            "leave",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Check whether a link may be followed on path/suffix grounds.
    pub fn allows_path(&self, url: &url::Url) -> bool {
        let path = url.path();
        !self
            .excluded_path_segments
            .iter()
            .any(|segment| path.contains(segment.as_str()))
            && !self.has_excluded_suffix(url)
    }

    /// Sitemap-like targets are never turned into documents.
    pub fn has_excluded_suffix(&self, url: &url::Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        self.excluded_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
    }

    /// Check a page's visible text against the relevance keywords.
    pub fn is_relevant(&self, text: &str) -> bool {
        if self.relevance_keywords.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        self.relevance_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
    }
}

/// Text splitting parameters, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// Create a config. Overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }
}

/// Upsert batching and rate-limit backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub batch_size: usize,
    pub max_retries: u32,

    /// The sleep after the n-th rate-limited attempt (0-based) is
    /// `base_delay * 2^n`.
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_retries: 5,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl IndexConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after the given failed attempt (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Fan-out parameters for the retrieve tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results per namespace.
    pub k: usize,

    pub general_namespace: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 4,
            general_namespace: GENERAL_NAMESPACE.to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }
}

/// Popular-question mining parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    pub namespace: String,

    /// Only questions newer than this are considered.
    pub window_days: i64,

    pub clusters: usize,

    /// Seed for centroid initialisation.
    pub seed: u64,

    pub max_iterations: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            namespace: USER_QUESTIONS_NAMESPACE.to_string(),
            window_days: 7,
            clusters: 3,
            seed: 42,
            max_iterations: 300,
        }
    }
}

impl MiningConfig {
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters.max(1);
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
