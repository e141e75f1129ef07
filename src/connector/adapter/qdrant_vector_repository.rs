use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::VectorRepository;
use crate::domain::{DomainError, VectorMatch, VectorRecord};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Payload field holding the caller's record id; Qdrant itself only accepts UUIDs or integers.
const RECORD_ID_FIELD: &str = "record_id";

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: &'a [f32],
    payload: Map<String, Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

/// Vector store backed by a Qdrant server over its REST API.
pub struct QdrantVectorRepository {
    client: reqwest::Client,
    base_url: String,
}

impl QdrantVectorRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base.trim_end_matches('/').to_string(),
        }
    }

    /// Reads `QDRANT_URL`, defaulting to a local server.
    pub fn from_env() -> Self {
        Self::new(std::env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string()))
    }

    fn point_id(id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
    }

    fn collection_url(&self, collection: &str, path: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, collection, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, DomainError> {
        request
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Qdrant {what} failed: {e}")))
    }

    async fn expect_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response, DomainError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("Qdrant {what} returned {status}: {body}");
        Err(DomainError::storage(format!("Qdrant {what} returned {status}")))
    }
}

#[async_trait]
impl VectorRepository for QdrantVectorRepository {
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), DomainError> {
        let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
        let response = self
            .send(self.client.put(self.collection_url(collection, "")).json(&body), "create collection")
            .await?;
        if response.status() == StatusCode::CONFLICT {
            debug!("Qdrant collection {collection} already exists");
            return Ok(());
        }
        Self::expect_success(response, "create collection").await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<(), DomainError> {
        self.upsert_batch(collection, vec![record]).await
    }

    async fn upsert_batch(&self, collection: &str, records: Vec<VectorRecord>) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }
        let points: Vec<Point<'_>> = records
            .iter()
            .map(|record| {
                let mut payload = record.metadata().clone();
                payload.insert(RECORD_ID_FIELD.into(), json!(record.id()));
                Point {
                    id: Self::point_id(record.id()),
                    vector: record.vector(),
                    payload,
                }
            })
            .collect();

        let response = self
            .send(
                self.client
                    .put(self.collection_url(collection, "/points?wait=true"))
                    .json(&json!({ "points": points })),
                "upsert",
            )
            .await?;
        Self::expect_success(response, "upsert").await?;
        debug!("Upserted {} points into Qdrant collection {collection}", records.len());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, DomainError> {
        let body = json!({ "vector": vector, "limit": top_k, "with_payload": true });
        let response = self
            .send(
                self.client.post(self.collection_url(collection, "/points/search")).json(&body),
                "search",
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let parsed: SearchResponse = Self::expect_success(response, "search")
            .await?
            .json()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to parse Qdrant search response: {e}")))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| {
                let mut payload = point.payload.unwrap_or_default();
                let id = match payload.remove(RECORD_ID_FIELD) {
                    Some(Value::String(id)) => id,
                    _ => match point.id {
                        Value::String(id) => id,
                        other => other.to_string(),
                    },
                };
                VectorMatch::new(id, point.score, payload)
            })
            .collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DomainError> {
        let body = json!({ "points": [Self::point_id(id)] });
        let response = self
            .send(
                self.client
                    .post(self.collection_url(collection, "/points/delete?wait=true"))
                    .json(&body),
                "delete",
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response, "delete").await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let response = self
            .send(
                self.client
                    .post(self.collection_url(collection, "/points/count"))
                    .json(&json!({ "exact": true })),
                "count",
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let parsed: CountResponse = Self::expect_success(response, "count")
            .await?
            .json()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to parse Qdrant count response: {e}")))?;
        Ok(parsed.result.count)
    }
}
