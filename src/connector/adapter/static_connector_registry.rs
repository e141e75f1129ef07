use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::application::ConnectorRegistry;
use crate::domain::{Connector, DomainError};

#[derive(Deserialize)]
#[serde(untagged)]
enum ConnectorFile {
    Wrapped { connectors: Vec<Connector> },
    List(Vec<Connector>),
}

/// Fixed connector list, usually loaded from a JSON file.
///
/// The file holds either a bare array of connectors or `{"connectors": [...]}`.
#[derive(Debug, Clone, Default)]
pub struct StaticConnectorRegistry {
    connectors: Vec<Connector>,
}

impl StaticConnectorRegistry {
    pub fn new(connectors: Vec<Connector>) -> Self {
        Self { connectors }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let parsed: ConnectorFile = serde_json::from_str(json)
            .map_err(|e| DomainError::parse(format!("Invalid connectors file: {e}")))?;
        let connectors = match parsed {
            ConnectorFile::Wrapped { connectors } | ConnectorFile::List(connectors) => connectors,
        };

        let mut seen = std::collections::HashSet::new();
        for connector in &connectors {
            if !seen.insert(connector.id()) {
                return Err(DomainError::invalid_input(format!(
                    "Duplicate connector id: {}",
                    connector.id()
                )));
            }
        }
        Ok(Self { connectors })
    }

    /// Loads the registry from `path`; a missing file yields an empty registry.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No connectors file at {}, starting with none", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&json)?;
        info!(
            "Loaded {} connectors from {}",
            registry.connectors.len(),
            path.display()
        );
        Ok(registry)
    }
}

#[async_trait]
impl ConnectorRegistry for StaticConnectorRegistry {
    async fn list_connectors(&self) -> Result<Vec<Connector>, DomainError> {
        Ok(self.connectors.clone())
    }

    async fn get_connector(&self, id: &str) -> Result<Connector, DomainError> {
        self.connectors
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Connector not found: {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectorStatus, ConnectorType};

    const CONNECTORS: &str = r#"{
        "connectors": [
            {"id": "pg", "name": "Warehouse", "type": "postgres", "status": "connected",
             "config": {"tables": [{"name": "orders"}]}},
            {"id": "bi", "name": "Superset", "type": "superset", "status": "disconnected"}
        ]
    }"#;

    #[tokio::test]
    async fn loads_wrapped_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connectors.json");
        std::fs::write(&path, CONNECTORS).unwrap();

        let registry = StaticConnectorRegistry::from_file(&path).unwrap();
        let all = registry.list_connectors().await.unwrap();
        assert_eq!(all.len(), 2);

        let pg = registry.get_connector("pg").await.unwrap();
        assert_eq!(pg.connector_type(), ConnectorType::Postgres);
        assert!(pg.is_connected());
        assert_eq!(
            registry.get_connector("bi").await.unwrap().status(),
            ConnectorStatus::Disconnected
        );
        assert!(registry.get_connector("nope").await.unwrap_err().is_not_found());
    }

    #[test]
    fn accepts_bare_arrays_and_missing_files() {
        let registry = StaticConnectorRegistry::from_json(
            r#"[{"id": "api", "name": "Events", "type": "api", "status": "connected"}]"#,
        )
        .unwrap();
        assert_eq!(registry.connectors.len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let empty = StaticConnectorRegistry::from_file(dir.path().join("absent.json")).unwrap();
        assert!(empty.connectors.is_empty());
    }

    #[test]
    fn rejects_duplicates_and_garbage() {
        let dup = r#"[
            {"id": "a", "name": "A", "type": "api", "status": "connected"},
            {"id": "a", "name": "B", "type": "api", "status": "connected"}
        ]"#;
        assert!(StaticConnectorRegistry::from_json(dup).unwrap_err().is_invalid_input());
        assert!(StaticConnectorRegistry::from_json("{not json").is_err());
    }
}
