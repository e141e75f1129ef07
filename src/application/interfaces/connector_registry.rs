use async_trait::async_trait;

use crate::domain::{Connector, DomainError};

/// Read access to the configured data-source connectors.
#[async_trait]
pub trait ConnectorRegistry: Send + Sync {
    async fn list_connectors(&self) -> Result<Vec<Connector>, DomainError>;

    /// Fails with `NotFound` for unknown ids.
    async fn get_connector(&self, id: &str) -> Result<Connector, DomainError>;
}
