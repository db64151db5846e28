//! Domain-bounded recursive crawler.
//!
//! Starting from a seed, pages are fetched, classified by declared content
//! type, turned into documents and followed into same-domain links up to
//! `max_depth`. A [`CrawlSession`] owns the visited set for one run, so
//! every normalized URL is fetched at most once even when links cycle.
//! Failures are per URL: they are logged and that branch yields nothing.

mod html;
mod http;
mod pdf;
mod rate_limited;
mod seed;

pub use html::{parse_page, ParsedPage};
pub use http::HttpFetcher;
pub use pdf::{parse_pdf, ParsedPdf, PdfPage};
pub use rate_limited::{FetcherExt, RateLimitedFetcher};
pub use seed::{ProvinceSeeds, SeedDoc, SeedEntry, SeedManifest};

use std::collections::HashSet;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::chunker::Chunker;
use crate::traits::fetcher::{FetchedResource, Fetcher};
use crate::types::config::CrawlConfig;
use crate::types::document::{Chunk, Document, DocumentMetadata};

/// Where crawled documents belong and which host bounds the crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub namespace: String,
    pub company: Option<String>,

    /// Host (with port, if any) links must match.
    pub domain: String,
}

impl CrawlTarget {
    pub fn new(namespace: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            company: None,
            domain: domain.into(),
        }
    }

    /// Bound the crawl to the seed's own host.
    pub fn for_seed(seed: &Url, namespace: impl Into<String>) -> Self {
        Self::new(namespace, netloc(seed))
    }

    /// Attach a company. Blank names are ignored.
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        let company = company.into();
        self.company = (!company.trim().is_empty()).then(|| company.trim().to_string());
        self
    }
}

/// `host[:port]` of a URL.
pub fn netloc(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Visited set for one crawl run.
#[derive(Debug, Default)]
pub struct CrawlSession {
    visited: HashSet<String>,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL visited. Returns false if it already was.
    pub fn visit(&mut self, url: &Url) -> bool {
        self.visited.insert(url.as_str().to_string())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Recursive crawler over any [`Fetcher`].
pub struct Crawler<F: Fetcher> {
    fetcher: F,
    config: CrawlConfig,
    chunker: Chunker,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            config,
            chunker: Chunker::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawl from `seed_url` in a fresh session and return chunks.
    pub async fn crawl(&self, seed_url: &str, target: &CrawlTarget) -> Vec<Chunk> {
        let mut session = CrawlSession::new();
        self.crawl_with_session(&mut session, seed_url, target).await
    }

    /// Crawl within an existing session and return chunks.
    pub async fn crawl_with_session(
        &self,
        session: &mut CrawlSession,
        seed_url: &str,
        target: &CrawlTarget,
    ) -> Vec<Chunk> {
        let docs = self.crawl_documents(session, seed_url, target).await;
        let chunks = self.chunker.split_documents(&docs);
        info!(
            seed = %seed_url,
            namespace = %target.namespace,
            documents = docs.len(),
            chunks = chunks.len(),
            "Crawl finished"
        );
        chunks
    }

    /// Crawl and return unsplit documents.
    pub async fn crawl_documents(
        &self,
        session: &mut CrawlSession,
        seed_url: &str,
        target: &CrawlTarget,
    ) -> Vec<Document> {
        match Url::parse(seed_url.trim()) {
            Ok(url) => self.visit(session, html::strip_fragment(url), target, 0).await,
            Err(e) => {
                warn!(url = %seed_url, error = %e, "Invalid seed URL, skipping");
                Vec::new()
            }
        }
    }

    /// Crawl every manifest entry in one session. Chunks are grouped by
    /// namespace in first-seen order.
    pub async fn crawl_manifest(&self, manifest: &SeedManifest) -> IndexMap<String, Vec<Chunk>> {
        let mut session = CrawlSession::new();
        let mut by_namespace: IndexMap<String, Vec<Chunk>> = IndexMap::new();

        for entry in manifest.entries() {
            let target = match Url::parse(&entry.url) {
                Ok(url) => CrawlTarget::for_seed(&url, entry.namespace.clone()),
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "Invalid seed URL, skipping");
                    continue;
                }
            };
            let chunks = self.crawl_with_session(&mut session, &entry.url, &target).await;
            by_namespace.entry(entry.namespace).or_default().extend(chunks);
        }

        by_namespace
    }

    fn visit<'a>(
        &'a self,
        session: &'a mut CrawlSession,
        url: Url,
        target: &'a CrawlTarget,
        depth: usize,
    ) -> BoxFuture<'a, Vec<Document>> {
        Box::pin(async move {
            if depth > self.config.max_depth || !session.visit(&url) {
                return Vec::new();
            }
            debug!(url = %url, depth, "Crawling");

            let resource = match self.fetcher.fetch(&url).await {
                Ok(resource) => resource,
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to fetch, skipping");
                    return Vec::new();
                }
            };
            if resource.url != url && !session.visit(&resource.url) {
                debug!(url = %url, final_url = %resource.url, "Redirect target already crawled");
                return Vec::new();
            }

            let (mut docs, links) = if resource.is_pdf() {
                match self.pdf_documents(&url, &resource, target) {
                    Some(found) => found,
                    None => return Vec::new(),
                }
            } else {
                match self.html_document(&url, &resource, target) {
                    Some((doc, links)) => (vec![doc], links),
                    None => return Vec::new(),
                }
            };

            for link in links {
                if !session.is_visited(&link) {
                    docs.extend(self.visit(session, link, target, depth + 1).await);
                }
            }
            docs
        })
    }

    fn html_document(
        &self,
        url: &Url,
        resource: &FetchedResource,
        target: &CrawlTarget,
    ) -> Option<(Document, Vec<Url>)> {
        if self.config.has_excluded_suffix(url) {
            debug!(url = %url, "Skipping sitemap");
            return None;
        }

        let body = String::from_utf8_lossy(&resource.body);
        let page = parse_page(&body, &resource.url);
        if !self.config.is_relevant(&page.text) {
            debug!(url = %url, "Page not relevant, skipping");
            return None;
        }

        let links = page
            .links
            .into_iter()
            .filter(|link| netloc(link) == target.domain && self.config.allows_path(link))
            .collect();
        let metadata = DocumentMetadata::html(url.as_str(), page.title, target.namespace.as_str())
            .with_company(target.company.as_deref());

        Some((Document::new(page.text, metadata), links))
    }

    fn pdf_documents(
        &self,
        url: &Url,
        resource: &FetchedResource,
        target: &CrawlTarget,
    ) -> Option<(Vec<Document>, Vec<Url>)> {
        let parsed = match parse_pdf(&resource.body, &resource.url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to parse PDF, skipping");
                return None;
            }
        };

        let docs = parsed
            .pages
            .into_iter()
            .map(|page| {
                let metadata = DocumentMetadata::pdf(url.as_str(), page.index, target.namespace.as_str())
                    .with_title(parsed.title.clone())
                    .with_company(target.company.as_deref());
                Document::new(page.text, metadata)
            })
            .collect();
        let links = parsed
            .links
            .into_iter()
            .filter(|link| netloc(link) == target.domain)
            .collect();

        Some((docs, links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::document::DocumentKind;

    fn target() -> CrawlTarget {
        CrawlTarget::new("Ontario", "www.ontario.ca")
    }

    #[tokio::test]
    async fn test_single_page_without_links() {
        let text = "Employment standards apply to most workers. ".repeat(60);
        let fetcher = MockFetcher::new().with_html(
            "https://www.ontario.ca/esa",
            &format!("<html><head><title>ESA</title></head><body><p>{text}</p></body></html>"),
        );
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/esa", &target())
            .await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.kind, DocumentKind::Html);
        assert_eq!(docs[0].metadata.title, "ESA");
        assert_eq!(docs[0].metadata.namespace, "Ontario");

        let chunks = crawler.crawl("https://www.ontario.ca/esa", &target()).await;
        let len = docs[0].content.chars().count();
        let expected = (len - 200).div_ceil(800);
        assert!(chunks.len() + 1 >= expected && chunks.len() <= expected + 1);
    }

    #[tokio::test]
    async fn test_cycle_fetched_once() {
        let fetcher = MockFetcher::new()
            .with_html("https://www.ontario.ca/a", r#"<p>A</p><a href="/b">b</a><a href="/a#top">self</a>"#)
            .with_html("https://www.ontario.ca/b", r#"<p>B</p><a href="/a">a</a>"#);
        let crawler = Crawler::new(fetcher, CrawlConfig::default().with_max_depth(5));

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/a", &target())
            .await;

        assert_eq!(docs.len(), 2);
        assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/a"), 1);
        assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/b"), 1);
        assert_eq!(session.visited_count(), 2);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let fetcher = MockFetcher::new()
            .with_html("https://www.ontario.ca/0", r#"<p>0</p><a href="/1">n</a>"#)
            .with_html("https://www.ontario.ca/1", r#"<p>1</p><a href="/2">n</a>"#)
            .with_html("https://www.ontario.ca/2", r#"<p>2</p><a href="/3">n</a>"#)
            .with_html("https://www.ontario.ca/3", r#"<p>3</p>"#);
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/0", &target())
            .await;

        assert_eq!(docs.len(), 3);
        assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/3"), 0);
    }

    #[tokio::test]
    async fn test_link_filters() {
        let fetcher = MockFetcher::new().with_html(
            "https://www.ontario.ca/start",
            r#"<p>start</p>
               <a href="https://other.ca/page">offsite</a>
               <a href="/fr/page">french</a>
               <a href="/sitemap.xml">sitemap</a>
               <a href="/ok">ok</a>"#,
        )
        .with_html("https://www.ontario.ca/ok", "<p>ok</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/start", &target())
            .await;

        assert_eq!(docs.len(), 2);
        let fetched = crawler.fetcher().calls();
        assert_eq!(fetched, vec!["https://www.ontario.ca/start", "https://www.ontario.ca/ok"]);
    }

    #[tokio::test]
    async fn test_failures_yield_empty_branch() {
        let fetcher = MockFetcher::new()
            .with_html(
                "https://www.ontario.ca/start",
                r#"<p>start</p><a href="/missing">gone</a><a href="/bad.pdf">pdf</a><a href="/ok">ok</a>"#,
            )
            .with_pdf("https://www.ontario.ca/bad.pdf", b"not really a pdf".to_vec())
            .with_html("https://www.ontario.ca/ok", "<p>ok</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/start", &target())
            .await;

        let sources: Vec<&str> = docs.iter().map(|d| d.metadata.source_url.as_str()).collect();
        assert_eq!(sources, vec!["https://www.ontario.ca/start", "https://www.ontario.ca/ok"]);
    }

    #[tokio::test]
    async fn test_content_type_decides_kind() {
        // A ".pdf" URL served as HTML is parsed as HTML.
        let fetcher = MockFetcher::new().with_html("https://www.ontario.ca/guide.pdf", "<p>html after all</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/guide.pdf", &target())
            .await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.kind, DocumentKind::Html);
    }

    #[tokio::test]
    async fn test_company_attached() {
        let fetcher = MockFetcher::new().with_html("https://acme.example/policy", "<p>Vacation policy</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let target = CrawlTarget::new("Acme", "acme.example").with_company("Acme");

        let chunks = crawler.crawl("https://acme.example/policy", &target).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_irrelevant_page_dropped_with_links() {
        let fetcher = MockFetcher::new()
            .with_html("https://www.ontario.ca/news", r#"<p>Weather today</p><a href="/esa">esa</a>"#)
            .with_html("https://www.ontario.ca/esa", "<p>Overtime rules</p>");
        let config = CrawlConfig::default().with_relevance_keywords(CrawlConfig::employment_keywords());
        let crawler = Crawler::new(fetcher, config);

        let chunks = crawler.crawl("https://www.ontario.ca/news", &target()).await;
        assert!(chunks.is_empty());
        assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/esa"), 0);
    }

    #[tokio::test]
    async fn test_pdf_pages_and_annotation_links() {
        let body = pdf::sample_pdf(
            "Employment Standards",
            &["Overtime page one", "Vacation page two"],
            Some("https://www.ontario.ca/linked"),
        );
        let fetcher = MockFetcher::new()
            .with_pdf("https://www.ontario.ca/esa.pdf", body)
            .with_html("https://www.ontario.ca/linked", "<p>linked page</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/esa.pdf", &target())
            .await;

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].metadata.kind, DocumentKind::Pdf);
        assert_eq!(docs[0].metadata.page, Some(0));
        assert_eq!(docs[1].metadata.page, Some(1));
        assert_eq!(docs[0].metadata.title, "Employment Standards");
        assert!(docs[0].content.contains("Overtime page one"));
        assert!(docs[1].content.contains("Vacation page two"));
        assert_eq!(docs[2].metadata.kind, DocumentKind::Html);
        assert_eq!(docs[2].metadata.source_url, "https://www.ontario.ca/linked");
        assert_eq!(
            crawler.fetcher().calls(),
            vec!["https://www.ontario.ca/esa.pdf", "https://www.ontario.ca/linked"]
        );
    }

    #[tokio::test]
    async fn test_links_resolve_against_redirect_target() {
        let fetcher = MockFetcher::new()
            .with_redirect("https://www.ontario.ca/esa", "https://www.ontario.ca/esa/")
            .with_html("https://www.ontario.ca/esa/", r#"<p>guide</p><a href="vacation">vacation</a>"#)
            .with_html("https://www.ontario.ca/esa/vacation", "<p>Vacation pay</p>")
            .with_html("https://www.ontario.ca/vacation", "<p>wrong page</p>");
        let crawler = Crawler::new(fetcher, CrawlConfig::default());

        let mut session = CrawlSession::new();
        let docs = crawler
            .crawl_documents(&mut session, "https://www.ontario.ca/esa", &target())
            .await;

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].metadata.source_url, "https://www.ontario.ca/esa/vacation");
        assert_eq!(crawler.fetcher().calls_for("https://www.ontario.ca/vacation"), 0);
        assert!(session.is_visited(&Url::parse("https://www.ontario.ca/esa/").unwrap()));
    }

    #[tokio::test]
    async fn test_manifest_shares_session() {
        let fetcher = MockFetcher::new()
            .with_html("https://www.canada.ca/jobs", r#"<p>federal</p><a href="/shared">s</a>"#)
            .with_html("https://www.canada.ca/shared", "<p>shared</p>")
            .with_html("https://www.canada.ca/ontario", r#"<p>ontario</p><a href="/shared">s</a>"#);
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let manifest = SeedManifest::from_json(
            r#"{"General": [{"url": "https://www.canada.ca/jobs"}],
                "provinces": [{"name": "Ontario", "docs": [{"url": "https://www.canada.ca/ontario"}]}]}"#,
        )
        .unwrap();

        let grouped = crawler.crawl_manifest(&manifest).await;
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["General", "Ontario"]);
        assert_eq!(grouped["General"].len(), 2);
        assert_eq!(grouped["Ontario"].len(), 1);
        assert_eq!(crawler.fetcher().calls_for("https://www.canada.ca/shared"), 1);
    }
}
