//! End-to-end tests over the public API with in-memory collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use insightplan::{
    ClassificationSource, ClassifyDomainUseCase, ClassifyIntentUseCase, ConfigSchemaScanner,
    Connector, ConnectorRegistry, ConnectorStatus, ConnectorType, ContextIngestionService,
    DomainContextGenerator, DomainError, EmbeddingService, InMemoryResultCache,
    InMemoryVectorRepository, IntentType,
    MockEmbedding, PlannerService, Query, QueryProcessor, RetrievalStrategy, Row, SchemaScanner,
    SourceClient, SourceOrchestrator, StaticConnectorRegistry, TaskStatus, VectorRepository,
    DOMAIN_COLLECTION,
};

/// Source client that answers every request with the same rows and counts calls.
struct StubClient {
    rows: Vec<Row>,
    calls: AtomicUsize,
}

impl StubClient {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for StubClient {
    fn supports(&self, _connector_type: ConnectorType) -> bool {
        true
    }

    async fn fetch(
        &self,
        _connector: &Connector,
        _strategy: &RetrievalStrategy,
    ) -> Result<Vec<Row>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }

    async fn fetch_sample(&self, _connector: &Connector, _limit: usize) -> Result<Vec<Row>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}

/// What a scripted source does for one connector and strategy label.
#[derive(Clone)]
enum Reply {
    Rows(Vec<Row>),
    Fail,
    Hang,
}

/// Source client that answers per connector and strategy label, and logs every request.
struct ScriptedClient {
    replies: HashMap<(String, String), Reply>,
    log: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: &[(&str, &str, Reply)]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(id, label, reply)| ((id.to_string(), label.to_string()), reply.clone()))
                .collect(),
            log: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    async fn answer(&self, connector: &Connector, label: &str) -> Result<Vec<Row>, DomainError> {
        self.log.lock().unwrap().push(format!("{}:{label}", connector.id()));
        match self.replies.get(&(connector.id().to_string(), label.to_string())) {
            Some(Reply::Rows(rows)) => Ok(rows.clone()),
            Some(Reply::Fail) => Err(DomainError::source("scripted failure")),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(vec![row(json!({"late": true}))])
            }
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl SourceClient for ScriptedClient {
    fn supports(&self, _connector_type: ConnectorType) -> bool {
        true
    }

    async fn fetch(&self, connector: &Connector, strategy: &RetrievalStrategy) -> Result<Vec<Row>, DomainError> {
        self.answer(connector, &strategy.label()).await
    }

    async fn fetch_sample(&self, connector: &Connector, _limit: usize) -> Result<Vec<Row>, DomainError> {
        self.answer(connector, "sample").await
    }
}

/// Source client that echoes the dataset keywords back as a row.
struct EchoClient {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceClient for EchoClient {
    fn supports(&self, _connector_type: ConnectorType) -> bool {
        true
    }

    async fn fetch(&self, _connector: &Connector, strategy: &RetrievalStrategy) -> Result<Vec<Row>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match strategy {
            RetrievalStrategy::MatchingDataset { keywords } => Ok(vec![row(json!({"topic": keywords.join(" ")}))]),
            _ => Ok(Vec::new()),
        }
    }

    async fn fetch_sample(&self, _connector: &Connector, _limit: usize) -> Result<Vec<Row>, DomainError> {
        Ok(Vec::new())
    }
}

struct TestEnv {
    embedding: Arc<dyn EmbeddingService>,
    vectors: Arc<InMemoryVectorRepository>,
    registry: Arc<dyn ConnectorRegistry>,
    planner: Arc<PlannerService>,
}

fn setup_test_env(connectors: Vec<Connector>) -> TestEnv {
    let embedding: Arc<dyn EmbeddingService> = Arc::new(MockEmbedding::new());
    let vectors = Arc::new(InMemoryVectorRepository::new());
    let registry: Arc<dyn ConnectorRegistry> = Arc::new(StaticConnectorRegistry::new(connectors));
    let intents = Arc::new(ClassifyIntentUseCase::new());
    let domains = Arc::new(ClassifyDomainUseCase::new(
        embedding.clone(),
        vectors.clone(),
        intents.clone(),
    ));
    TestEnv {
        embedding,
        vectors,
        registry,
        planner: Arc::new(PlannerService::new(intents, domains)),
    }
}

impl TestEnv {
    fn ingestion(&self) -> ContextIngestionService {
        let scanners: Vec<Arc<dyn SchemaScanner>> = vec![Arc::new(ConfigSchemaScanner::new())];
        let generator = Arc::new(DomainContextGenerator::new(self.registry.clone(), scanners));
        ContextIngestionService::new(
            self.embedding.clone(),
            self.vectors.clone(),
            self.registry.clone(),
            generator,
        )
    }

    fn processor(&self, client: Arc<StubClient>) -> QueryProcessor {
        let orchestrator = SourceOrchestrator::new(self.registry.clone(), vec![client as Arc<dyn SourceClient>])
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(5));
        QueryProcessor::new(self.planner.clone(), Arc::new(orchestrator))
    }
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

fn warehouse(status: ConnectorStatus) -> Connector {
    Connector::new("warehouse", "Shop warehouse", ConnectorType::Postgres, status).with_config(
        json!({
            "tables": [
                {"name": "orders", "description": "Customer orders",
                 "columns": [
                    {"name": "order_id", "type": "integer"},
                    {"name": "customer_id", "type": "integer"},
                    {"name": "total_amount", "type": "numeric"},
                    {"name": "created_at", "type": "timestamp"}
                 ]},
                {"name": "customers",
                 "columns": [
                    {"name": "customer_id", "type": "integer"},
                    {"name": "region", "type": "text"}
                 ]}
            ]
        })
        .as_object()
        .cloned()
        .expect("config literal must be an object"),
    )
}

fn dashboards() -> Connector {
    Connector::new("bi", "Superset", ConnectorType::Superset, ConnectorStatus::Connected)
}

#[tokio::test]
async fn test_sales_performance_plans_analytics_chain() {
    let env = setup_test_env(Vec::new());
    let cancel = CancellationToken::new();

    let plan = env
        .planner
        .parse_intent(
            &Query::new("show me sales performance by region"),
            &BTreeMap::new(),
            &cancel,
        )
        .await
        .expect("planning should succeed");

    assert_eq!(plan.intent.intent_type(), IntentType::Analytics);
    assert!((plan.confidence - 0.8).abs() < 1e-9);

    let actions: Vec<&str> = plan.task_graph.steps().iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions, vec!["discover_sources", "fetch_data", "analyze_data"]);
    assert_eq!(plan.task_graph.estimated_total(), Duration::from_secs(15));
    assert_eq!(
        plan.task_graph.execution_order().unwrap(),
        vec!["data_discovery", "data_retrieval", "data_analysis"]
    );
}

#[tokio::test]
async fn test_quarter_comparison_is_a_strict_chain() {
    let env = setup_test_env(Vec::new());
    let plan = env
        .planner
        .parse_intent(
            &Query::new("compare Q1 vs Q2 revenue"),
            &BTreeMap::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(plan.intent.intent_type(), IntentType::Comparison);
    assert!((plan.confidence - 0.8).abs() < 1e-9);

    let steps = plan.task_graph.steps();
    let actions: Vec<&str> = steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions, vec!["fetch_comparison_data", "align_data", "compare_data"]);
    assert!(steps[0].dependencies.is_empty());
    for pair in steps.windows(2) {
        assert_eq!(pair[1].dependencies, vec![pair[0].id.clone()]);
    }
}

#[tokio::test]
async fn test_planning_is_deterministic_for_same_query_and_time() {
    let env = setup_test_env(Vec::new());
    let cancel = CancellationToken::new();
    let query = Query::new("trend of weekly signups over time").with_timestamp(chrono::Utc::now());

    let first = env.planner.parse_intent(&query, &BTreeMap::new(), &cancel).await.unwrap();
    let second = env.planner.parse_intent(&query, &BTreeMap::new(), &cancel).await.unwrap();
    assert_eq!(first.task_graph, second.task_graph);
    assert_eq!(first.intent, second.intent);
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let env = setup_test_env(Vec::new());
    let err = env
        .planner
        .parse_intent(&Query::new("   "), &BTreeMap::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

#[tokio::test]
async fn test_no_connectors_means_no_data_without_calls() {
    let env = setup_test_env(Vec::new());
    let client = Arc::new(StubClient::new(vec![row(json!({"revenue": 1}))]));
    let orchestrator = SourceOrchestrator::new(env.registry.clone(), vec![client.clone() as Arc<dyn SourceClient>]);

    let err = orchestrator
        .retrieve(
            &Query::new("show me sales performance"),
            IntentType::Analytics,
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_no_data());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_empty_sources_surface_no_data_and_never_fabricate() {
    let env = setup_test_env(vec![dashboards()]);
    let client = Arc::new(StubClient::new(Vec::new()));
    let processor = env.processor(client.clone());

    let err = processor
        .execute(
            &Query::new("show me sales performance by region"),
            &BTreeMap::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_no_data());
    assert!(client.calls() > 0, "every strategy and the sample should have been tried");
}

#[tokio::test]
async fn test_query_retrieves_rows_and_defers_analysis() {
    let env = setup_test_env(vec![dashboards()]);
    let client = Arc::new(StubClient::new(vec![
        row(json!({"region": "EU", "revenue": 120})),
        row(json!({"region": "US", "revenue": 340})),
    ]));
    let processor = env.processor(client);

    let outcome = processor
        .execute(
            &Query::new("show me sales performance by region"),
            &BTreeMap::new(),
            &CancellationToken::new(),
        )
        .await
        .expect("rows are available");

    assert_eq!(outcome.retrieval.row_count(), 2);
    assert_eq!(outcome.retrieval.sources.len(), 1);
    assert_eq!(outcome.retrieval.sources[0].connector_id, "bi");
    assert_eq!(outcome.classification.source, ClassificationSource::Fallback);

    let graph = &outcome.plan.task_graph;
    assert_eq!(graph.status(), TaskStatus::Completed);
    assert_eq!(graph.step("data_discovery").unwrap().status, TaskStatus::Completed);
    assert_eq!(graph.step("data_retrieval").unwrap().status, TaskStatus::Completed);
    assert_eq!(graph.step("data_analysis").unwrap().status, TaskStatus::Deferred);
}

#[tokio::test]
async fn test_cancelled_query_aborts() {
    let env = setup_test_env(vec![dashboards()]);
    let processor = env.processor(Arc::new(StubClient::new(vec![row(json!({"n": 1}))])));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = processor
        .execute(&Query::new("show me sales performance"), &BTreeMap::new(), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_domain_ingestion_is_idempotent() {
    let env = setup_test_env(Vec::new());
    let ingestion = env.ingestion();
    let cancel = CancellationToken::new();

    let first = ingestion.ingest_domain_contexts(&cancel).await.unwrap();
    let after_first = env.vectors.count(DOMAIN_COLLECTION).await.unwrap();
    let second = ingestion.ingest_domain_contexts(&cancel).await.unwrap();
    let after_second = env.vectors.count(DOMAIN_COLLECTION).await.unwrap();

    assert!(first.is_clean());
    assert_eq!(first.ingested, second.ingested);
    assert_eq!(after_first, 6);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_connector_sweep_skips_disconnected_sources() {
    let offline = Connector::new("legacy", "Legacy CRM", ConnectorType::Mysql, ConnectorStatus::Disconnected);
    let env = setup_test_env(vec![warehouse(ConnectorStatus::Connected), offline]);
    let ingestion = env.ingestion();
    let cancel = CancellationToken::new();

    let report = ingestion.ingest_all_connector_contexts(&cancel).await.unwrap();
    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    assert!(!report.ingested.is_empty());
    assert!(report.skipped.iter().any(|id| id == "legacy"));

    let count = env.vectors.count(DOMAIN_COLLECTION).await.unwrap();
    let again = ingestion.ingest_all_connector_contexts(&cancel).await.unwrap();
    assert_eq!(report.ingested, again.ingested);
    assert_eq!(env.vectors.count(DOMAIN_COLLECTION).await.unwrap(), count);
}

#[tokio::test]
async fn test_connector_without_schema_is_reported_not_fatal() {
    let bare = Connector::new("events", "Event API", ConnectorType::Api, ConnectorStatus::Connected);
    let env = setup_test_env(vec![warehouse(ConnectorStatus::Connected), bare]);

    let report = env
        .ingestion()
        .ingest_all_connector_contexts(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].connector_id, "events");
    assert!(!report.ingested.is_empty());
}

#[tokio::test]
async fn test_classification_uses_ingested_contexts() {
    let env = setup_test_env(Vec::new());
    let cancel = CancellationToken::new();
    env.ingestion().ingest_domain_contexts(&cancel).await.unwrap();

    let result = env
        .planner
        .classify_query("show me sales performance", &cancel)
        .await
        .unwrap();

    assert_eq!(result.source, ClassificationSource::Vector);
    assert!((0.0..=1.0).contains(&result.confidence));
    assert_eq!(result.intent, IntentType::Analytics);
}

#[tokio::test]
async fn test_startup_ingestion_loads_builtins_and_connectors() {
    let env = setup_test_env(vec![warehouse(ConnectorStatus::Connected)]);
    let ingestion = Arc::new(env.ingestion());

    let report = ingestion
        .spawn_startup_ingestion(CancellationToken::new())
        .await
        .expect("ingestion task should not panic");

    assert!(report.is_clean());
    assert!(report.ingested.iter().any(|key| key == "domain_gaming"));
    assert!(report.ingested.len() > 6);
    assert!(env.vectors.count(DOMAIN_COLLECTION).await.unwrap() >= 6);
}

#[tokio::test]
async fn test_first_non_empty_strategy_wins() {
    let env = setup_test_env(vec![dashboards()]);
    let client = Arc::new(ScriptedClient::new(&[
        ("bi", "matching_dashboard", Reply::Rows(vec![row(json!({"chart": "revenue"}))])),
        ("bi", "matching_dataset", Reply::Rows(vec![row(json!({"dataset": "revenue"}))])),
    ]));
    let orchestrator = SourceOrchestrator::new(env.registry.clone(), vec![client.clone() as Arc<dyn SourceClient>]);

    let outcome = orchestrator
        .retrieve(&Query::new("weekly revenue trend"), IntentType::Trend, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.sources[0].strategy, "matching_dashboard");
    assert_eq!(outcome.rows, vec![row(json!({"chart": "revenue"}))]);
    assert_eq!(client.log(), vec!["bi:matching_dashboard"]);
}

#[tokio::test]
async fn test_rows_are_concatenated_across_sources_despite_failures() {
    let slow = Connector::new("events", "Event API", ConnectorType::Api, ConnectorStatus::Connected);
    let env = setup_test_env(vec![dashboards(), warehouse(ConnectorStatus::Connected), slow]);
    let client = Arc::new(ScriptedClient::new(&[
        ("bi", "matching_dashboard", Reply::Fail),
        ("bi", "matching_dataset", Reply::Rows(vec![row(json!({"week": 1, "revenue": 10}))])),
        ("warehouse", "sample", Reply::Rows(vec![row(json!({"order_id": 7}))])),
        ("events", "matching_dataset", Reply::Hang),
        ("events", "sample", Reply::Fail),
    ]));
    let orchestrator = SourceOrchestrator::new(env.registry.clone(), vec![client.clone() as Arc<dyn SourceClient>])
        .with_timeouts(Duration::from_millis(50), Duration::from_secs(5));

    let outcome = orchestrator
        .retrieve(&Query::new("weekly revenue trend"), IntentType::Trend, None, &CancellationToken::new())
        .await
        .expect("two sources still contribute");

    let contributed: Vec<(&str, &str)> = outcome
        .sources
        .iter()
        .map(|s| (s.connector_id.as_str(), s.strategy.as_str()))
        .collect();
    assert_eq!(contributed, vec![("bi", "matching_dataset"), ("warehouse", "sample")]);
    assert_eq!(
        outcome.rows,
        vec![row(json!({"week": 1, "revenue": 10})), row(json!({"order_id": 7}))]
    );
    assert_eq!(outcome.attempted, vec!["bi", "warehouse", "events"]);

    let log = client.log();
    assert!(!log.contains(&"bi:sample".to_string()), "sample is only a last resort");
    assert!(log.contains(&"warehouse:matching_dataset".to_string()));
    assert!(log.contains(&"events:sample".to_string()));
}

#[tokio::test]
async fn test_cached_rows_are_not_shared_between_queries() {
    let env = setup_test_env(vec![warehouse(ConnectorStatus::Connected)]);
    let client = Arc::new(EchoClient {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = SourceOrchestrator::new(env.registry.clone(), vec![client.clone() as Arc<dyn SourceClient>])
        .with_cache(Arc::new(InMemoryResultCache::default()));
    let cancel = CancellationToken::new();

    let first = orchestrator
        .retrieve(&Query::new("revenue by region"), IntentType::Analytics, None, &cancel)
        .await
        .unwrap();
    let second = orchestrator
        .retrieve(&Query::new("employee headcount"), IntentType::Analytics, None, &cancel)
        .await
        .unwrap();
    assert_eq!(first.rows[0]["topic"], "revenue region");
    assert_eq!(second.rows[0]["topic"], "employee headcount");

    let again = orchestrator
        .retrieve(&Query::new("revenue by region"), IntentType::Analytics, None, &cancel)
        .await
        .unwrap();
    assert_eq!(again.rows, first.rows);
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}
