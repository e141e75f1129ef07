use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::{DomainError, Embedding, EmbeddingConfig};

pub const MOCK_MODEL: &str = "mock-embedding";
pub const MOCK_DIMENSIONS: usize = 384;

/// Deterministic pseudo-embeddings seeded from the text hash. Identical text, identical vector.
pub struct MockEmbedding {
    config: EmbeddingConfig,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new(MOCK_MODEL, dimensions),
        }
    }

    fn generate_vector(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.trim().to_lowercase().hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut vector: Vec<f32> = (0..self.config.dimensions())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let vector = self.generate_vector(text);
        debug!("Generated mock embedding with {} dimensions", vector.len());
        Ok(Embedding::new(vector, self.config.model_name()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError> {
        let embeddings: Vec<Embedding> = texts
            .iter()
            .map(|text| Embedding::new(self.generate_vector(text), self.config.model_name()))
            .collect();
        debug!("Generated {} mock embeddings", embeddings.len());
        Ok(embeddings)
    }

    async fn health(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
