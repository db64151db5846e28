//! Crawl-and-index flows used by the CLI.

use tracing::info;

use super::indexer::{IndexReport, Indexer};
use crate::crawler::{CrawlTarget, Crawler, SeedManifest};
use crate::error::Result;
use crate::traits::{ai::Embedder, fetcher::Fetcher, store::VectorStore};

/// Summary of one namespace's ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestResult {
    pub namespace: String,
    pub chunks: usize,
    pub report: IndexReport,
}

/// Crawl one seed and add its chunks to the target namespace.
pub async fn ingest<F, S, E>(
    crawler: &Crawler<F>,
    indexer: &Indexer<'_, S, E>,
    seed_url: &str,
    target: &CrawlTarget,
) -> IngestResult
where
    F: Fetcher,
    S: VectorStore,
    E: Embedder,
{
    let chunks = crawler.crawl(seed_url, target).await;
    let report = indexer.upsert(&target.namespace, &chunks).await;
    info!(
        seed = %seed_url,
        namespace = %target.namespace,
        chunks = chunks.len(),
        indexed = report.indexed,
        "Ingest finished"
    );

    IngestResult {
        namespace: target.namespace.clone(),
        chunks: chunks.len(),
        report,
    }
}

/// Crawl every manifest seed in one session, then replace each namespace
/// with its fresh chunks.
pub async fn ingest_manifest<F, S, E>(
    crawler: &Crawler<F>,
    indexer: &Indexer<'_, S, E>,
    manifest: &SeedManifest,
) -> Result<Vec<IngestResult>>
where
    F: Fetcher,
    S: VectorStore,
    E: Embedder,
{
    let grouped = crawler.crawl_manifest(manifest).await;

    let mut results = Vec::with_capacity(grouped.len());
    for (namespace, chunks) in grouped {
        let report = indexer.replace_namespace(&namespace, &chunks).await?;
        info!(namespace = %namespace, chunks = chunks.len(), indexed = report.indexed, "Namespace replaced");
        results.push(IngestResult {
            namespace,
            chunks: chunks.len(),
            report,
        });
    }
    Ok(results)
}
