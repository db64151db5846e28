//! Indexing pipeline: crawl → chunk → embed → upsert.

pub mod index;
pub mod indexer;
pub mod ingest;

pub use index::{chunk_id, DocumentIndex};
pub use indexer::{IndexReport, Indexer};
pub use ingest::{ingest, ingest_manifest, IngestResult};
