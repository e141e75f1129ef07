use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::cli::OutputFormat;
use crate::domain::SchemaContext;

use super::super::Container;

pub struct AnalyzeController<'a> {
    container: &'a Container,
}

impl<'a> AnalyzeController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn analyze(
        &self,
        connector_id: String,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let context = self
            .container
            .context_generator()
            .analyze_business_context(&connector_id, cancel)
            .await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(&context)?,
            OutputFormat::Text => self.format_context(&context),
        })
    }

    fn format_context(&self, context: &SchemaContext) -> String {
        let mut out = format!(
            "{} ({}, {})\nPrimary domain: {} (confidence {:.2})\n\n",
            context.connector_name,
            context.connector_id,
            context.connector_type,
            context.primary_domain,
            context.confidence
        );

        out.push_str(&format!("Tables ({}):\n", context.tables.len()));
        for table in &context.tables {
            out.push_str(&format!(
                "  {}.{} [{}] {} columns, {} metrics\n",
                table.schema,
                table.name,
                table.domain,
                table.columns.len(),
                table.metric_columns().count()
            ));
        }

        if !context.business_metrics.is_empty() {
            out.push_str("\nMetrics:\n");
            for metric in &context.business_metrics {
                out.push_str(&format!(
                    "  {} = {}({}.{})\n",
                    metric.name,
                    metric.aggregation.as_str(),
                    metric.source_table,
                    metric.source_column
                ));
            }
        }

        if !context.relationships.is_empty() {
            out.push_str("\nRelationships:\n");
            for rel in &context.relationships {
                out.push_str(&format!(
                    "  {}.{} -> {}.{} ({})\n",
                    rel.from_table, rel.from_column, rel.to_table, rel.to_column, rel.relation
                ));
            }
        }

        if !context.sample_queries.is_empty() {
            out.push_str("\nSample queries:\n");
            for query in &context.sample_queries {
                out.push_str(&format!("  - {}\n", query));
            }
        }
        out
    }
}
