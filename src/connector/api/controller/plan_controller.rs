use std::collections::BTreeMap;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::cli::OutputFormat;
use crate::domain::{ClassificationResult, PlanResponse, Query};

use super::super::Container;

pub struct PlanController<'a> {
    container: &'a Container,
}

impl<'a> PlanController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn plan(
        &self,
        query: String,
        connectors: Vec<String>,
        context: Vec<(String, String)>,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let query = Query::new(query).with_connector_ids(connectors);
        let context: BTreeMap<String, String> = context.into_iter().collect();
        let plan = self
            .container
            .planner()
            .parse_intent(&query, &context, cancel)
            .await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(&plan)?,
            OutputFormat::Text => format_plan(&plan),
        })
    }

    pub async fn classify(
        &self,
        query: String,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.container.warm_up(cancel).await?;
        let result = self
            .container
            .planner()
            .classify_query(&query, cancel)
            .await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(&result)?,
            OutputFormat::Text => format_classification(&result),
        })
    }
}

pub(super) fn format_plan(plan: &PlanResponse) -> String {
    let graph = &plan.task_graph;
    let mut out = format!(
        "Intent: {} (confidence {:.2})\nPlan {} with {} steps, est. {:.1}s, planned in {}ms\n\n",
        plan.intent.intent_type(),
        plan.confidence,
        graph.id(),
        graph.steps().len(),
        graph.estimated_total().as_secs_f64(),
        plan.process_time.as_millis()
    );

    for (i, step) in graph.steps().iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {} ({}, {:.1}s)\n",
            i + 1,
            step.step_type,
            step.description,
            step.status,
            step.estimated_duration.as_secs_f64()
        ));
        if !step.dependencies.is_empty() {
            out.push_str(&format!("   after: {}\n", step.dependencies.join(", ")));
        }
    }

    let entities = plan.intent.entities();
    if !entities.is_empty() {
        out.push_str("\nEntities:\n");
        for (kind, values) in entities {
            out.push_str(&format!("  {}: {}\n", kind, values.join(", ")));
        }
    }
    out
}

pub(super) fn format_classification(result: &ClassificationResult) -> String {
    let mut out = format!(
        "Domain: {} (confidence {:.2}, via {:?})\nIntent: {}\n{}\n",
        result.domain, result.confidence, result.source, result.intent, result.reasoning
    );
    if !result.keywords.is_empty() {
        out.push_str(&format!("Keywords: {}\n", result.keywords.join(", ")));
    }
    if !result.tables.is_empty() {
        out.push_str(&format!("Tables: {}\n", result.tables.join(", ")));
    }
    out
}
