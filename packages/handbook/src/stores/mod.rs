//! Storage implementations.

mod memory;

#[cfg(feature = "pinecone")]
mod pinecone;

pub use memory::{MemoryConversationStore, MemoryVectorStore};

#[cfg(feature = "pinecone")]
pub use pinecone::PineconeStore;
