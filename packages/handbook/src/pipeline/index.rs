//! Text-level facade over a vector store.
//!
//! Chunks go in as text and come back out as [`Document`]s; embedding and
//! record conversion happen here so callers never touch raw vectors.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{
    ai::Embedder,
    search::SearchIndex,
    store::{IndexStats, MetadataFilter, VectorRecord, VectorStore},
};
use crate::types::document::{Chunk, Document};

/// Embeds and stores chunks, and searches them back by text.
pub struct DocumentIndex<S: VectorStore, E: Embedder> {
    store: S,
    embedder: E,
}

impl<S: VectorStore, E: Embedder> DocumentIndex<S, E> {
    pub fn new(store: S, embedder: E) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed and upsert chunks into `namespace`. Returns records written.
    ///
    /// Ids are content hashes, so re-indexing the same chunk overwrites it.
    pub async fn add_chunks(&self, namespace: &str, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| {
                VectorRecord::new(chunk_id(chunk), values, chunk.as_document().to_record_metadata())
            })
            .collect();

        let written = self.store.upsert(namespace, records).await?;
        debug!(namespace, written, "Indexed chunks");
        Ok(written)
    }

    /// Drop every record in `namespace`.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.store.delete(namespace, None).await?;
        Ok(())
    }

    /// Drop the records of one source URL (exact match) in `namespace`.
    pub async fn delete_by_source(&self, namespace: &str, source_url: &str) -> Result<()> {
        let filter = MetadataFilter::equals("source", source_url);
        self.store.delete(namespace, Some(&filter)).await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(self.store.stats().await?)
    }
}

#[async_trait]
impl<S: VectorStore, E: Embedder> SearchIndex for DocumentIndex<S, E> {
    async fn similarity_search(&self, query: &str, namespace: &str, k: usize) -> Result<Vec<Document>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.query(namespace, &vector, k, None).await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| match Document::from_record_metadata(&hit.record.metadata) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(id = %hit.record.id, namespace, error = %e, "Skipping malformed record");
                    None
                }
            })
            .collect())
    }
}

/// Stable id for a chunk: hash of source, position and text.
pub fn chunk_id(chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.metadata.source_url.as_bytes());
    hasher.update(chunk.metadata.page.unwrap_or(0).to_le_bytes());
    hasher.update((chunk.span.start as u64).to_le_bytes());
    hasher.update(chunk.content.as_bytes());
    format!("{:x}", hasher.finalize())
}
