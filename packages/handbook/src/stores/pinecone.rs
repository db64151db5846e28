//! Pinecone data-plane REST store.
//!
//! Talks to an index host directly (`https://<index>-<project>.svc.<env>.pinecone.io`).
//! HTTP 429 maps to [`StoreError::RateLimited`] so callers can back off.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{IndexStats, MetadataFilter, ScoredRecord, VectorRecord, VectorStore};

const API_VERSION: &str = "2024-07";
const PAGE_LIMIT: usize = 100;

/// Vector store backed by a Pinecone index.
#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
}

impl PineconeStore {
    /// `host` may be given with or without scheme.
    pub fn new(api_key: impl Into<String>, host: impl Into<String>) -> Self {
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Http(Box::new(e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %message, "Pinecone request failed");
        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(StoreError::RateLimited(message))
        } else {
            Err(StoreError::Backend {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> StoreResult<T> {
        response.json().await.map_err(|e| StoreError::Http(Box::new(e)))
    }

    async fn list_ids(&self, namespace: &str) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![
                ("namespace", namespace.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(t) = &token {
                query.push(("paginationToken", t.clone()));
            }

            let response = self
                .send(self.request(Method::GET, "/vectors/list").query(&query))
                .await?;
            let page: ListResponse = Self::json(response).await?;
            ids.extend(page.vectors.into_iter().map(|v| v.id));

            match page.pagination.and_then(|p| p.next) {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }

    async fn fetch(&self, namespace: &str, ids: &[String]) -> StoreResult<Vec<VectorRecord>> {
        let mut query: Vec<(&str, &str)> = vec![("namespace", namespace)];
        query.extend(ids.iter().map(|id| ("ids", id.as_str())));

        let response = self
            .send(self.request(Method::GET, "/vectors/fetch").query(&query))
            .await?;
        let mut fetched: FetchResponse = Self::json(response).await?;

        // Keep list order; the response map is unordered.
        Ok(ids
            .iter()
            .filter_map(|id| fetched.vectors.remove(id))
            .map(WireVector::into_record)
            .collect())
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let body = UpsertRequest {
            vectors: records.iter().map(WireVector::from_record).collect(),
            namespace,
        };
        let response = self
            .send(self.request(Method::POST, "/vectors/upsert").json(&body))
            .await?;
        let result: UpsertResponse = Self::json(response).await?;

        debug!(namespace, count = result.upserted_count, "Pinecone upsert");
        Ok(result.upserted_count)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> StoreResult<Vec<ScoredRecord>> {
        let mut body = serde_json::json!({
            "namespace": namespace,
            "vector": vector,
            "topK": top_k,
            "includeValues": true,
            "includeMetadata": true,
        });
        if let Some(filter) = filter {
            body["filter"] = filter.to_pinecone();
        }

        let response = self
            .send(self.request(Method::POST, "/query").json(&body))
            .await?;
        let result: QueryResponse = Self::json(response).await?;

        Ok(result
            .matches
            .into_iter()
            .map(|m| ScoredRecord {
                score: m.score,
                record: m.vector.into_record(),
            })
            .collect())
    }

    async fn delete(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<()> {
        let body = match filter {
            None => serde_json::json!({ "namespace": namespace, "deleteAll": true }),
            Some(f) => serde_json::json!({ "namespace": namespace, "filter": f.to_pinecone() }),
        };
        self.send(self.request(Method::POST, "/vectors/delete").json(&body))
            .await?;
        Ok(())
    }

    async fn stats(&self) -> StoreResult<IndexStats> {
        let response = self
            .send(
                self.request(Method::POST, "/describe_index_stats")
                    .json(&serde_json::json!({})),
            )
            .await?;
        let result: StatsResponse = Self::json(response).await?;

        Ok(IndexStats {
            namespaces: result
                .namespaces
                .into_iter()
                .map(|(name, s)| (name, s.vector_count))
                .collect(),
            dimension: result.dimension,
        })
    }

    async fn scan(&self, namespace: &str, filter: Option<&MetadataFilter>) -> StoreResult<Vec<VectorRecord>> {
        let ids = self.list_ids(namespace).await?;
        let mut records = Vec::with_capacity(ids.len());
        for batch in ids.chunks(PAGE_LIMIT) {
            records.extend(self.fetch(namespace, batch).await?);
        }
        Ok(records
            .into_iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .collect())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct WireVector {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl WireVector {
    fn from_record(record: &VectorRecord) -> Self {
        Self {
            id: record.id.clone(),
            values: record.values.clone(),
            metadata: (!record.metadata.is_empty()).then(|| record.metadata.clone()),
        }
    }

    fn into_record(self) -> VectorRecord {
        VectorRecord {
            id: self.id,
            values: self.values,
            metadata: self.metadata.map(normalize_numbers).unwrap_or_default(),
        }
    }
}

/// Pinecone returns every number as a float; integral values go back to
/// integers so typed metadata (page indexes) deserializes.
fn normalize_numbers(metadata: Map<String, Value>) -> Map<String, Value> {
    metadata
        .into_iter()
        .map(|(k, v)| {
            let v = match v.as_f64() {
                Some(f) if v.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(f as i64),
                _ => v,
            };
            (k, v)
        })
        .collect()
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector>,
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(flatten)]
    vector: WireVector,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
    dimension: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedId {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, WireVector>,
}
