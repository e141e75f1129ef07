use async_trait::async_trait;

use crate::domain::{DomainError, VectorMatch, VectorRecord};

/// Named collections of vectors with similarity search.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Creates the collection if it does not exist yet.
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<(), DomainError>;

    /// Inserts or replaces the record with the same id.
    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<(), DomainError>;

    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<VectorRecord>,
    ) -> Result<(), DomainError> {
        for record in records {
            self.upsert(collection, record).await?;
        }
        Ok(())
    }

    /// Best matches first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, DomainError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), DomainError>;

    async fn count(&self, collection: &str) -> Result<u64, DomainError>;
}
