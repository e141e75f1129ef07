use async_trait::async_trait;

use crate::domain::{DomainError, Embedding, EmbeddingConfig};

/// Generates vector embeddings from text.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Checks that the backing model is reachable.
    async fn health(&self) -> Result<(), DomainError>;

    fn config(&self) -> &EmbeddingConfig;

    fn dimension(&self) -> usize {
        self.config().dimensions()
    }
}
