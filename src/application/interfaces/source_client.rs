use async_trait::async_trait;

use crate::domain::{Connector, ConnectorType, DomainError, RetrievalStrategy, Row};

/// Pulls rows out of one kind of data source.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn supports(&self, connector_type: ConnectorType) -> bool;

    /// Rows for one query-specific strategy. An empty result is not an error.
    async fn fetch(
        &self,
        connector: &Connector,
        strategy: &RetrievalStrategy,
    ) -> Result<Vec<Row>, DomainError>;

    /// A representative sample of whatever the source holds.
    async fn fetch_sample(&self, connector: &Connector, limit: usize) -> Result<Vec<Row>, DomainError>;
}
