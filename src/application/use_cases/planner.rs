use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::classify_domain::ClassifyDomainUseCase;
use super::classify_intent::ClassifyIntentUseCase;
use crate::domain::{
    ClassificationResult, DomainError, EntityExtractor, PlanResponse, Query, QueryStructureParser,
    TaskGraphBuilder,
};

/// Turns a natural-language query into a classified intent and an executable task graph.
///
/// Planning never writes persisted state; the only outbound calls are the
/// optional generative classifier and the domain lookup.
pub struct PlannerService {
    intents: Arc<ClassifyIntentUseCase>,
    domains: Arc<ClassifyDomainUseCase>,
    entities: EntityExtractor,
    structure: QueryStructureParser,
    graphs: TaskGraphBuilder,
}

impl PlannerService {
    pub fn new(intents: Arc<ClassifyIntentUseCase>, domains: Arc<ClassifyDomainUseCase>) -> Self {
        Self {
            intents,
            domains,
            entities: EntityExtractor::new(),
            structure: QueryStructureParser::new(),
            graphs: TaskGraphBuilder::new(),
        }
    }

    /// Classifies the query, extracts entities and structure, and builds the task graph.
    ///
    /// `context` entries are carried on the intent as `context.<key>` parameters.
    pub async fn parse_intent(
        &self,
        query: &Query,
        context: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<PlanResponse, DomainError> {
        if query.is_blank() {
            return Err(DomainError::invalid_input("query text is empty"));
        }
        let started = Instant::now();

        let classified = self.intents.execute(query.text(), cancel).await?;
        let intent_type = classified.intent_type();
        let classifier = classified
            .parameters()
            .get("classifier")
            .cloned()
            .unwrap_or_else(|| "pattern".to_string());

        let entities = self.entities.extract(query.text());
        let mut parsed = self.structure.parse(query.text(), intent_type, &entities);
        parsed.data_sources = query.connector_ids().to_vec();

        let graph = self.graphs.build(intent_type, &parsed, query);

        let mut intent = classified.with_entities(entities).with_parsed_query(parsed);
        for (key, value) in context {
            intent = intent.with_parameter(format!("context.{key}"), value.clone());
        }

        let entity_count: usize = intent.entities().values().map(Vec::len).sum();
        let mut metadata = BTreeMap::new();
        metadata.insert("entities_found".to_string(), entity_count.to_string());
        metadata.insert("steps_planned".to_string(), graph.steps().len().to_string());
        metadata.insert("classifier".to_string(), classifier);
        metadata.insert(
            "estimated_seconds".to_string(),
            graph.estimated_total().as_secs().to_string(),
        );

        info!(
            "Planned '{}' as {} ({:.2}) with {} steps",
            query.text(),
            intent_type,
            intent.confidence(),
            graph.steps().len()
        );

        Ok(PlanResponse {
            confidence: intent.confidence(),
            intent,
            task_graph: graph,
            process_time: started.elapsed(),
            created_at: Utc::now(),
            metadata,
        })
    }

    pub async fn classify_query(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, DomainError> {
        self.domains.execute(query, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::adapter::{InMemoryVectorRepository, MockEmbedding};
    use crate::domain::{IntentType, TaskStepType};

    fn planner() -> PlannerService {
        let intents = Arc::new(ClassifyIntentUseCase::new());
        let domains = Arc::new(ClassifyDomainUseCase::new(
            Arc::new(MockEmbedding::new()),
            Arc::new(InMemoryVectorRepository::new()),
            intents.clone(),
        ));
        PlannerService::new(intents, domains)
    }

    #[tokio::test]
    async fn analytics_plan_has_three_ordered_steps() {
        let plan = planner()
            .parse_intent(
                &Query::new("show me sales performance by region"),
                &BTreeMap::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(plan.intent.intent_type(), IntentType::Analytics);
        assert_eq!(plan.confidence, 0.8);
        let ids: Vec<&str> = plan.task_graph.steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["data_discovery", "data_retrieval", "data_analysis"]);
        assert_eq!(plan.task_graph.estimated_total().as_secs(), 15);
        assert_eq!(plan.metadata.get("steps_planned").map(String::as_str), Some("3"));
        assert_eq!(plan.metadata.get("classifier").map(String::as_str), Some("pattern"));
        assert!(plan.task_graph.has_step_type(TaskStepType::DataRetrieval));
    }

    #[tokio::test]
    async fn connector_ids_become_data_sources() {
        let query = Query::new("compare Q1 vs Q2 revenue").with_connector_ids(vec!["superset-1".into()]);
        let mut context = BTreeMap::new();
        context.insert("user".to_string(), "analyst".to_string());

        let plan = planner()
            .parse_intent(&query, &context, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(plan.intent.parsed_query().data_sources, vec!["superset-1".to_string()]);
        assert_eq!(
            plan.intent.parameters().get("context.user").map(String::as_str),
            Some("analyst")
        );
        let first = &plan.task_graph.steps()[0];
        assert_eq!(first.data_sources, vec!["superset-1".to_string()]);
    }

    #[tokio::test]
    async fn blank_query_is_invalid_input() {
        let err = planner()
            .parse_intent(&Query::new("  "), &BTreeMap::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
