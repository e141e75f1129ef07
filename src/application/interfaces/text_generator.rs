use async_trait::async_trait;

use crate::domain::DomainError;

/// Free-text completion from a generative model.
///
/// Implementors own transport and vendor details; callers only see a prompt
/// going in and text coming out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
