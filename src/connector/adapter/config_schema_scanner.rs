use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::application::SchemaScanner;
use crate::domain::{ColumnInfo, Connector, ConnectorType, DomainError, TableContext};

#[derive(Deserialize)]
struct DeclaredColumn {
    name: String,
    #[serde(rename = "type", default)]
    data_type: String,
}

#[derive(Deserialize)]
struct DeclaredTable {
    name: String,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    columns: Vec<DeclaredColumn>,
}

/// Reads table declarations from the connector's own `tables` config entry.
///
/// Serves every connector type, so it is registered after the live scanners.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigSchemaScanner;

impl ConfigSchemaScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SchemaScanner for ConfigSchemaScanner {
    fn supports(&self, _connector_type: ConnectorType) -> bool {
        true
    }

    async fn scan(&self, connector: &Connector) -> Result<Vec<TableContext>, DomainError> {
        let Some(declared) = connector.config().get("tables") else {
            return Err(DomainError::schema_scan(format!(
                "Connector {} declares no tables",
                connector.id()
            )));
        };
        let declared: Vec<DeclaredTable> = serde_json::from_value(declared.clone()).map_err(|e| {
            DomainError::schema_scan(format!(
                "Invalid table declarations for {}: {e}",
                connector.id()
            ))
        })?;

        let tables: Vec<TableContext> = declared
            .into_iter()
            .map(|table| {
                let columns = table
                    .columns
                    .into_iter()
                    .map(|c| ColumnInfo::infer(c.name, c.data_type))
                    .collect();
                let mut context = TableContext::new(table.name, columns)
                    .with_description(table.description)
                    .with_tags(table.tags);
                if let Some(schema) = table.schema {
                    context = context.with_schema(schema);
                }
                context
            })
            .collect();

        debug!("Connector {} declares {} tables", connector.id(), tables.len());
        Ok(tables)
    }
}
