use async_trait::async_trait;

use crate::domain::{Connector, ConnectorType, DomainError, TableContext};

/// Discovers table structure behind a connector. Structure and metadata only, never row data.
#[async_trait]
pub trait SchemaScanner: Send + Sync {
    fn supports(&self, connector_type: ConnectorType) -> bool;

    async fn scan(&self, connector: &Connector) -> Result<Vec<TableContext>, DomainError>;
}
