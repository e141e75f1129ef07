use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::cli::{IngestTarget, OutputFormat};
use crate::domain::IngestionReport;

use super::super::Container;

pub struct IngestController<'a> {
    container: &'a Container,
}

impl<'a> IngestController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ingest(
        &self,
        target: IngestTarget,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let ingestion = self.container.ingestion();
        let report = match target {
            IngestTarget::All => ingestion.spawn_startup_ingestion(cancel.clone()).await?,
            IngestTarget::Domains => ingestion.ingest_domain_contexts(cancel).await?,
            IngestTarget::Connector { id } => ingestion.ingest_connector_contexts(&id, cancel).await?,
            IngestTarget::Refresh { id } => ingestion.refresh_connector_context(&id, cancel).await?,
        };

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(&report)?,
            OutputFormat::Text => self.format_report(&report),
        })
    }

    fn format_report(&self, report: &IngestionReport) -> String {
        let mut out = format!("{}\n", report.summary());
        if !report.ingested.is_empty() {
            out.push_str(&format!("Ingested: {}\n", report.ingested.join(", ")));
        }
        if !report.skipped.is_empty() {
            out.push_str(&format!("Skipped (not connected): {}\n", report.skipped.join(", ")));
        }
        for failure in &report.failures {
            out.push_str(&format!(
                "Failed: {} ({}): {}\n",
                failure.connector_name, failure.connector_id, failure.error
            ));
        }
        out
    }
}
