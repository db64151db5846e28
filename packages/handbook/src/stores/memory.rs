//! In-memory storage implementations for testing and local runs.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError, StoreResult};
use crate::traits::history::ConversationStore;
use crate::traits::store::{cosine_similarity, IndexStats, MetadataFilter, ScoredRecord, VectorRecord, VectorStore};
use crate::types::conversation::Turn;

/// Namespaced vector store held in memory.
///
/// Records keep insertion order within a namespace (an upsert of an
/// existing id keeps its original position), so scans are deterministic.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryVectorStore {
    namespaces: RwLock<HashMap<String, IndexMap<String, VectorRecord>>>,
}

impl MemoryVectorStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a namespace.
    pub async fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, IndexMap::len)
    }

    /// Clear all stored data.
    pub async fn clear(&self) {
        self.namespaces.write().await.clear();
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> StoreResult<usize> {
        let mut namespaces = self.namespaces.write().await;
        let ns = namespaces.entry(namespace.to_string()).or_default();

        if let Some(expected) = ns.values().next().map(|r| r.values.len()) {
            if let Some(bad) = records.iter().find(|r| r.values.len() != expected) {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: bad.values.len(),
                });
            }
        }

        let count = records.len();
        for record in records {
            ns.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<ScoredRecord>> {
        let namespaces = self.namespaces.read().await;
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredRecord> = ns
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredRecord {
                score: cosine_similarity(vector, &r.values),
                record: r.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().await;
        match filter {
            None => {
                namespaces.remove(namespace);
            }
            Some(filter) => {
                if let Some(ns) = namespaces.get_mut(namespace) {
                    ns.retain(|_, r| !filter.matches(&r.metadata));
                    if ns.is_empty() {
                        namespaces.remove(namespace);
                    }
                }
            }
        }
        Ok(())
    }

    async fn stats(&self) -> StoreResult<IndexStats> {
        let namespaces = self.namespaces.read().await;
        Ok(IndexStats {
            namespaces: namespaces
                .iter()
                .filter(|(_, ns)| !ns.is_empty())
                .map(|(name, ns)| (name.clone(), ns.len()))
                .collect(),
            dimension: namespaces
                .values()
                .find_map(|ns| ns.values().next().map(|r| r.values.len())),
        })
    }

    async fn scan(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<Vec<VectorRecord>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .map(|ns| {
                ns.values()
                    .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Conversation history held in memory, keyed by thread id.
#[derive(Default)]
pub struct MemoryConversationStore {
    threads: RwLock<HashMap<String, Vec<Turn>>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, thread_id: &str) -> Result<Vec<Turn>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, thread_id: &str, turns: Vec<Turn>) -> Result<()> {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .extend(turns);
        Ok(())
    }
}
