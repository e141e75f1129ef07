use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::EmbeddingService;
use crate::domain::{DomainError, Embedding, EmbeddingConfig};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings from a local Ollama server via `POST /api/embeddings`.
pub struct OllamaEmbedding {
    client: reqwest::Client,
    base_url: String,
    config: EmbeddingConfig,
}

impl OllamaEmbedding {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: base.trim_end_matches('/').to_string(),
            config: EmbeddingConfig::new(model, dimensions),
        }
    }

    /// | Variable                     | Default                  |
    /// |------------------------------|--------------------------|
    /// | `OLLAMA_BASE_URL`            | `http://localhost:11434` |
    /// | `OLLAMA_EMBEDDING_MODEL`     | `all-minilm`             |
    /// | `OLLAMA_EMBEDDING_DIMENSIONS`| `384`                    |
    pub fn from_env() -> Self {
        let base = std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var("OLLAMA_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
        let dimensions = std::env::var("OLLAMA_EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);
        Self::new(base, model, dimensions)
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::invalid_input("cannot embed empty text"));
        }

        let request = EmbeddingRequest {
            model: self.config.model_name(),
            prompt: text,
        };
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Ollama embeddings returned {status}: {body}");
            return Err(DomainError::embedding(format!("Ollama returned {status}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(format!("Failed to parse Ollama response: {e}")))?;

        if parsed.embedding.len() != self.config.dimensions() {
            return Err(DomainError::embedding(format!(
                "Ollama model {} returned {} dimensions, expected {}",
                self.config.model_name(),
                parsed.embedding.len(),
                self.config.dimensions()
            )));
        }
        debug!("Embedded {} chars with {}", text.len(), self.config.model_name());
        Ok(Embedding::new(parsed.embedding, self.config.model_name()))
    }

    async fn health(&self) -> Result<(), DomainError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("Ollama unreachable at {}: {e}", self.base_url)))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DomainError::embedding(format!(
                "Ollama health check returned {}",
                response.status()
            )))
        }
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
