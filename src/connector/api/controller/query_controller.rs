use std::collections::BTreeMap;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::application::QueryOutcome;
use crate::cli::OutputFormat;
use crate::domain::Query;

use super::super::Container;
use super::plan_controller::{format_classification, format_plan};

pub struct QueryController<'a> {
    container: &'a Container,
}

impl<'a> QueryController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn query(
        &self,
        query: String,
        connectors: Vec<String>,
        context: Vec<(String, String)>,
        rows: usize,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.container.warm_up(cancel).await?;
        let query = Query::new(query).with_connector_ids(connectors);
        let context: BTreeMap<String, String> = context.into_iter().collect();
        let outcome = self
            .container
            .processor()
            .execute(&query, &context, cancel)
            .await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
            OutputFormat::Text => self.format_outcome(&outcome, rows),
        })
    }

    fn format_outcome(&self, outcome: &QueryOutcome, max_rows: usize) -> String {
        let retrieval = &outcome.retrieval;
        let mut out = format_plan(&outcome.plan);
        out.push('\n');
        out.push_str(&format_classification(&outcome.classification));

        out.push_str(&format!(
            "\nRetrieved {} rows ({}domain-aware)\n",
            retrieval.row_count(),
            if retrieval.domain_aware { "" } else { "not " }
        ));
        for source in &retrieval.sources {
            out.push_str(&format!(
                "  {} ({}): {} rows via {}\n",
                source.connector_name, source.connector_id, source.row_count, source.strategy
            ));
        }

        for row in retrieval.rows.iter().take(max_rows) {
            let cells: Vec<String> = row.iter().map(|(k, v)| format!("{k}={v}")).collect();
            out.push_str(&format!("  | {}\n", cells.join("  ")));
        }
        if retrieval.row_count() > max_rows {
            out.push_str(&format!("  ... {} more\n", retrieval.row_count() - max_rows));
        }
        out
    }
}
