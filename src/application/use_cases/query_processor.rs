use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::planner::PlannerService;
use super::source_orchestrator::SourceOrchestrator;
use crate::domain::{
    ClassificationResult, DomainError, DomainHint, PlanResponse, Query, RetrievalOutcome,
    TaskStatus, TaskStepType,
};

/// Everything produced for one query: the plan, its domain routing, and the rows.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub plan: PlanResponse,
    pub classification: ClassificationResult,
    pub retrieval: RetrievalOutcome,
}

/// Plans a query, routes it by domain, and walks the task graph in dependency order.
///
/// Retrieval happens at the first data-retrieval step (or the first step when
/// the graph has none); analysis and presentation steps are left deferred for
/// the caller to run over the returned rows.
pub struct QueryProcessor {
    planner: Arc<PlannerService>,
    orchestrator: Arc<SourceOrchestrator>,
}

impl QueryProcessor {
    pub fn new(planner: Arc<PlannerService>, orchestrator: Arc<SourceOrchestrator>) -> Self {
        Self {
            planner,
            orchestrator,
        }
    }

    pub async fn execute(
        &self,
        query: &Query,
        context: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome, DomainError> {
        let mut plan = self.planner.parse_intent(query, context, cancel).await?;
        let classification = self.planner.classify_query(query.text(), cancel).await?;

        let hint = classification.routes_to_domain().then(|| DomainHint {
            domain: classification.domain.clone(),
            tables: classification.tables.clone(),
            keywords: classification.keywords.clone(),
        });
        if let Some(hint) = &hint {
            info!("Routing to {} domain with {} hinted tables", hint.domain, hint.tables.len());
        }

        let graph = &mut plan.task_graph;
        let order = graph.execution_order()?;
        let has_retrieval_step = graph.has_step_type(TaskStepType::DataRetrieval);
        graph.set_status(TaskStatus::Running);

        let mut retrieval: Option<RetrievalOutcome> = None;
        for (position, step_id) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                graph.set_status(TaskStatus::Failed);
                return Err(DomainError::cancelled("query execution"));
            }
            let retrieves = graph
                .step(step_id)
                .map(|s| s.step_type == TaskStepType::DataRetrieval)
                .unwrap_or(false)
                || (!has_retrieval_step && position == 0);

            if !retrieves {
                graph.set_step_status(step_id, TaskStatus::Deferred)?;
                continue;
            }
            if retrieval.is_some() {
                graph.set_step_status(step_id, TaskStatus::Completed)?;
                continue;
            }

            graph.set_step_status(step_id, TaskStatus::Running)?;
            debug!("Running step {step_id}");
            match self
                .orchestrator
                .retrieve(query, graph.intent(), hint.as_ref(), cancel)
                .await
            {
                Ok(outcome) => {
                    graph.set_step_status(step_id, TaskStatus::Completed)?;
                    retrieval = Some(outcome);
                }
                Err(e) => {
                    graph.set_step_status(step_id, TaskStatus::Failed)?;
                    graph.set_status(TaskStatus::Failed);
                    return Err(e);
                }
            }
        }

        let retrieval = retrieval.ok_or_else(|| DomainError::internal("task graph has no steps"))?;
        graph.set_status(TaskStatus::Completed);
        info!(
            "Query '{}' answered with {} rows from {} sources",
            query.text(),
            retrieval.row_count(),
            retrieval.sources.len()
        );

        Ok(QueryOutcome {
            plan,
            classification,
            retrieval,
        })
    }
}
