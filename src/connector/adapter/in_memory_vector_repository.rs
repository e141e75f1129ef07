use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::VectorRepository;
use crate::domain::{DomainError, VectorMatch, VectorRecord};

type Collection = HashMap<String, VectorRecord>;

/// Process-local vector store. Collections are created on first write if missing.
pub struct InMemoryVectorRepository {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryVectorRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn create_collection(&self, collection: &str, _dimension: usize) -> Result<(), DomainError> {
        let mut collections = self.collections.lock().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<(), DomainError> {
        let mut collections = self.collections.lock().await;
        let records = collections.entry(collection.to_string()).or_default();
        debug!("Upserting {} into in-memory collection {}", record.id(), collection);
        records.insert(record.id().to_string(), record);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, DomainError> {
        let collections = self.collections.lock().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(&VectorRecord, f32)> = records
            .values()
            .map(|record| (record, cosine_similarity(vector, record.vector())))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id().cmp(b.0.id()))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(record, score)| VectorMatch::new(record.id(), score, record.metadata().clone()))
            .collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DomainError> {
        let mut collections = self.collections.lock().await;
        if let Some(records) = collections.get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, DomainError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(collection).map(|r| r.len() as u64).unwrap_or(0))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        let mut metadata = Map::new();
        metadata.insert("domain".into(), json!(id));
        VectorRecord::new(id, vector, metadata)
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert("c", record("domain_sales", vec![1.0, 0.0])).await.unwrap();
        repo.upsert("c", record("domain_sales", vec![0.0, 1.0])).await.unwrap();
        assert_eq!(repo.count("c").await.unwrap(), 1);

        let hits = repo.search("c", &[0.0, 1.0], 3).await.unwrap();
        assert!((hits[0].score() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let repo = InMemoryVectorRepository::new();
        repo.create_collection("c", 2).await.unwrap();
        repo.upsert("c", record("a", vec![1.0, 0.0])).await.unwrap();
        repo.upsert("c", record("b", vec![0.6, 0.8])).await.unwrap();
        repo.upsert("c", record("z", vec![-1.0, 0.0])).await.unwrap();

        let hits = repo.search("c", &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(VectorMatch::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(hits[0].metadata_str("domain"), Some("a"));
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let repo = InMemoryVectorRepository::new();
        assert!(repo.search("nope", &[1.0], 3).await.unwrap().is_empty());
        assert_eq!(repo.count("nope").await.unwrap(), 0);
        repo.delete("nope", "x").await.unwrap();
    }
}
