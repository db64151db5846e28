//! Batched upserts with backoff on rate limits.

use tracing::{error, info, warn};

use super::index::DocumentIndex;
use crate::error::Result;
use crate::traits::{ai::Embedder, store::VectorStore};
use crate::types::config::IndexConfig;
use crate::types::document::Chunk;

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Batches attempted.
    pub batches: usize,

    /// Records written.
    pub indexed: usize,

    /// Rate-limited attempts that were retried.
    pub retries: usize,

    /// 0-based numbers of abandoned batches.
    pub failed_batches: Vec<usize>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// Sends chunks to a [`DocumentIndex`] in sequential batches.
///
/// A rate-limited batch is retried after `base_delay * 2^attempt` until
/// `max_retries` is exhausted. Any other failure abandons the batch at
/// once. Abandoned batches are logged and skipped; the run continues.
pub struct Indexer<'a, S: VectorStore, E: Embedder> {
    index: &'a DocumentIndex<S, E>,
    config: IndexConfig,
}

impl<'a, S: VectorStore, E: Embedder> Indexer<'a, S, E> {
    pub fn new(index: &'a DocumentIndex<S, E>) -> Self {
        Self {
            index,
            config: IndexConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn upsert(&self, namespace: &str, chunks: &[Chunk]) -> IndexReport {
        let mut report = IndexReport::default();

        for (batch_no, batch) in chunks.chunks(self.config.batch_size.max(1)).enumerate() {
            report.batches += 1;
            let mut attempt = 0;

            loop {
                match self.index.add_chunks(namespace, batch).await {
                    Ok(written) => {
                        report.indexed += written;
                        info!(namespace, batch = batch_no, written, "Upserted batch");
                        break;
                    }
                    Err(e) if e.is_rate_limited() && attempt < self.config.max_retries => {
                        let delay = self.config.backoff(attempt);
                        warn!(
                            namespace,
                            batch = batch_no,
                            attempt,
                            delay_secs = delay.as_secs_f64(),
                            "Rate limited, backing off"
                        );
                        report.retries += 1;
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        error!(namespace, batch = batch_no, attempt, error = %e, "Giving up on batch");
                        report.failed_batches.push(batch_no);
                        break;
                    }
                }
            }
        }

        report
    }

    /// Replace a namespace's contents: delete it if the store lists it,
    /// then upsert `chunks`.
    pub async fn replace_namespace(&self, namespace: &str, chunks: &[Chunk]) -> Result<IndexReport> {
        if self.index.stats().await?.contains(namespace) {
            info!(namespace, "Deleting existing namespace before re-index");
            self.index.delete_namespace(namespace).await?;
        }
        Ok(self.upsert(namespace, chunks).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::stores::MemoryVectorStore;
    use crate::testing::{FlakyVectorStore, MockEmbedder};
    use crate::types::document::DocumentMetadata;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                let text = format!("chunk number {i}");
                Chunk {
                    span: 0..text.chars().count(),
                    content: text,
                    metadata: DocumentMetadata::html(format!("https://a.ca/{i}"), "", "Ontario"),
                }
            })
            .collect()
    }

    fn fast() -> IndexConfig {
        IndexConfig::default()
            .with_batch_size(2)
            .with_base_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_batches_are_sequential() {
        let index = DocumentIndex::new(MemoryVectorStore::new(), MockEmbedder::new());
        let report = Indexer::new(&index).with_config(fast()).upsert("Ontario", &chunks(5)).await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.indexed, 5);
        assert!(report.is_complete());
        assert_eq!(index.store().count("Ontario").await, 5);
    }

    #[tokio::test]
    async fn test_rate_limit_retried() {
        let store = FlakyVectorStore::rate_limited(2);
        let index = DocumentIndex::new(store, MockEmbedder::new());
        let report = Indexer::new(&index).with_config(fast()).upsert("Ontario", &chunks(2)).await;

        assert_eq!(report.retries, 2);
        assert_eq!(report.indexed, 2);
        assert!(report.is_complete());
        assert_eq!(index.store().upsert_attempts(), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_abandons_batch() {
        let store = FlakyVectorStore::rate_limited(100);
        let index = DocumentIndex::new(store, MockEmbedder::new());
        let config = fast().with_max_retries(2);
        let report = Indexer::new(&index).with_config(config).upsert("Ontario", &chunks(4)).await;

        // Each batch gets max_retries + 1 attempts.
        assert_eq!(index.store().upsert_attempts(), 6);
        assert_eq!(report.failed_batches, vec![0, 1]);
        assert_eq!(report.indexed, 0);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let store = FlakyVectorStore::failing(1);
        let index = DocumentIndex::new(store, MockEmbedder::new());
        let report = Indexer::new(&index).with_config(fast()).upsert("Ontario", &chunks(4)).await;

        assert_eq!(report.retries, 0);
        assert_eq!(report.failed_batches, vec![0]);
        assert_eq!(report.indexed, 2);
    }

    #[tokio::test]
    async fn test_replace_namespace() {
        let index = DocumentIndex::new(MemoryVectorStore::new(), MockEmbedder::new());
        let indexer = Indexer::new(&index).with_config(fast());

        indexer.replace_namespace("Ontario", &chunks(4)).await.unwrap();
        indexer.replace_namespace("Ontario", &chunks(1)).await.unwrap();
        assert_eq!(index.store().count("Ontario").await, 1);
    }
}
