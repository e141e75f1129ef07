use anyhow::Result;

use crate::cli::OutputFormat;

use super::super::Container;

pub struct ConnectorsController<'a> {
    container: &'a Container,
}

impl<'a> ConnectorsController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn list(&self, format: OutputFormat) -> Result<String> {
        let connectors = self.container.registry().list_connectors().await?;

        if format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&connectors)?);
        }
        if connectors.is_empty() {
            return Ok(format!(
                "No connectors configured. Add them to {}",
                self.container.config().connectors_path().display()
            ));
        }

        let mut out = format!("{} connectors:\n", connectors.len());
        for connector in &connectors {
            out.push_str(&format!(
                "  {:<16} {:<10} {:<13} {}\n",
                connector.id(),
                connector.connector_type(),
                connector.status(),
                connector.name()
            ));
        }
        Ok(out)
    }
}
