//! Vector store trait and metadata filters.
//!
//! A store holds `(id, values, metadata)` records grouped into namespaces.
//! Namespaces are the only isolation unit; nothing crosses them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreResult;

/// A stored vector with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }
}

/// A query hit, highest score first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}

/// Per-namespace record counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub namespaces: BTreeMap<String, usize>,
    pub dimension: Option<usize>,
}

impl IndexStats {
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn total(&self) -> usize {
        self.namespaces.values().sum()
    }
}

/// Filter over record metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    /// `field == value`
    Equals { field: String, value: Value },

    /// Numeric `field >= value`
    AtLeast { field: String, value: f64 },

    /// Every inner filter matches.
    All(Vec<MetadataFilter>),
}

impl MetadataFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn at_least(field: impl Into<String>, value: f64) -> Self {
        Self::AtLeast {
            field: field.into(),
            value,
        }
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match self {
            Self::Equals { field, value } => metadata.get(field) == Some(value),
            Self::AtLeast { field, value } => metadata
                .get(field)
                .and_then(Value::as_f64)
                .is_some_and(|v| v >= *value),
            Self::All(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }

    /// Render in Pinecone's filter language.
    pub fn to_pinecone(&self) -> Value {
        match self {
            Self::Equals { field, value } => serde_json::json!({ field: { "$eq": value } }),
            Self::AtLeast { field, value } => serde_json::json!({ field: { "$gte": value } }),
            Self::All(filters) => serde_json::json!({
                "$and": filters.iter().map(Self::to_pinecone).collect::<Vec<_>>()
            }),
        }
    }
}

/// Namespaced vector storage.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records by id. Returns the number written.
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> StoreResult<usize>;

    /// Nearest records to `vector`, best first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<ScoredRecord>>;

    /// Delete matching records, or the whole namespace when `filter` is `None`.
    async fn delete(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<IndexStats>;

    /// Every record in the namespace matching `filter`, values included.
    async fn scan(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<Vec<VectorRecord>>;
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_filter_matching() {
        let record = meta(serde_json::json!({"source": "https://a.ca/x", "created_at": 100.0}));

        assert!(MetadataFilter::equals("source", "https://a.ca/x").matches(&record));
        assert!(!MetadataFilter::equals("source", "https://a.ca/y").matches(&record));
        assert!(MetadataFilter::at_least("created_at", 100.0).matches(&record));
        assert!(!MetadataFilter::at_least("created_at", 100.5).matches(&record));
        assert!(!MetadataFilter::at_least("missing", 0.0).matches(&record));

        let both = MetadataFilter::All(vec![
            MetadataFilter::equals("source", "https://a.ca/x"),
            MetadataFilter::at_least("created_at", 50.0),
        ]);
        assert!(both.matches(&record));
    }

    #[test]
    fn test_pinecone_rendering() {
        let filter = MetadataFilter::at_least("created_at", 10.0);
        assert_eq!(
            filter.to_pinecone(),
            serde_json::json!({"created_at": {"$gte": 10.0}})
        );
    }
}
