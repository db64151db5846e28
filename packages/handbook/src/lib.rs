//! Employment-Handbook Retrieval Library
//!
//! Answers employment questions from a namespaced vector store of public
//! guidance and company policy, with the answer split by audience.
//!
//! # Pieces
//!
//! - A domain-bounded crawler that turns web pages and PDFs into chunks
//!   and indexes them per province, `General` or company namespace.
//! - A conversation engine (DECIDE → RETRIEVE → GENERATE → END) that
//!   decides when to retrieve and asks for a two-section answer.
//! - An answer partitioner that separates public and company sections.
//! - A popular-question miner clustering recent archived questions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use handbook::{AskRequest, ConversationEngine, DocumentIndex, MemoryConversationStore, MemoryVectorStore};
//! use handbook::testing::{MockChatModel, MockEmbedder};
//!
//! let index = DocumentIndex::new(MemoryVectorStore::new(), MockEmbedder::new());
//! let engine = ConversationEngine::new(MockChatModel::new(), index, MemoryConversationStore::new());
//!
//! let answer = engine.ask(&AskRequest::new("Do I get paid overtime?", "Ontario")).await?;
//! println!("{}", answer.public_response);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for models, stores, fetching, history and time
//! - [`types`] - Documents, turns, questions and configuration
//! - [`crawler`] - Recursive crawler, HTML/PDF parsing, seed manifests
//! - [`chunker`] - 1000/200 overlapping splitter
//! - [`pipeline`] - Embedding, batched upserts and ingest flows
//! - [`engine`] - Conversation graph and prompts
//! - [`partition`] - Answer sections and source metadata
//! - [`questions`] - Question archive
//! - [`miner`] - Popular-question mining
//! - [`stores`] - Vector and conversation stores
//! - [`testing`] - Mock implementations for testing

pub mod chunker;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod miner;
pub mod partition;
pub mod pipeline;
pub mod questions;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use chunker::Chunker;
pub use crawler::{CrawlSession, CrawlTarget, Crawler, FetcherExt, HttpFetcher, SeedManifest};
pub use engine::{AskRequest, ConversationEngine, EngineOutput, EngineState, RetrieveArgs};
pub use error::{AiError, CrawlError, EngineError, HandbookError, Result, StoreError};
pub use miner::{popular_questions, QuestionMiner};
pub use partition::{partition_answer, PartitionedAnswer, SourceMetadata};
pub use pipeline::{ingest, ingest_manifest, DocumentIndex, IndexReport, Indexer, IngestResult};
pub use questions::QuestionArchive;
pub use traits::{
    ai::{ChatModel, Embedder, ToolSpec},
    clock::{Clock, SystemClock},
    fetcher::{FetchedResource, Fetcher},
    history::ConversationStore,
    search::SearchIndex,
    store::{IndexStats, MetadataFilter, VectorRecord, VectorStore},
};
pub use types::{
    config::{ChunkConfig, CrawlConfig, IndexConfig, MiningConfig, RetrievalConfig},
    conversation::{ModelReply, Role, ToolCall, Turn},
    document::{Chunk, Document, DocumentKind, DocumentMetadata},
    question::{PopularQuestion, UserQuestionRecord},
};

// Re-export stores
pub use stores::{MemoryConversationStore, MemoryVectorStore};

#[cfg(feature = "pinecone")]
pub use stores::PineconeStore;
