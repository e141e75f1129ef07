use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{
    ClassifyDomainUseCase, ClassifyIntentUseCase, ConnectorRegistry, ContextIngestionService,
    DomainContextGenerator, EmbeddingService, PlannerService, QueryProcessor, ResultCache,
    SchemaScanner, SourceClient, SourceOrchestrator, TextGenerator, VectorRepository,
    DOMAIN_COLLECTION,
};
use crate::connector::adapter::{
    AnthropicClient, ConfigSchemaScanner, DuckdbVectorRepository, InMemoryResultCache,
    InMemoryVectorRepository, MockEmbedding, OllamaEmbedding, OllamaGenerator, PostgresClient,
    QdrantVectorRepository, StaticConnectorRegistry, SupersetClient, DEFAULT_QDRANT_URL,
};
use crate::domain::IngestionReport;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum VectorStoreKind {
    Memory,
    #[default]
    Duckdb,
    Qdrant,
}

impl FromStr for VectorStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "duckdb" => Ok(Self::Duckdb),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(format!("unknown vector store '{other}'")),
        }
    }
}

/// Which generative model, if any, backs the fallback classifier and schema suggestions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmProvider {
    /// Anthropic when its environment is configured, otherwise none.
    #[default]
    Auto,
    Anthropic,
    Ollama,
    None,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown llm provider '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub data_dir: PathBuf,
    /// Defaults to `connectors.json` inside the data dir.
    pub connectors_file: Option<PathBuf>,
    pub vector_store: VectorStoreKind,
    pub qdrant_url: String,
    pub mock_embeddings: bool,
    pub llm: LlmProvider,
    pub lookup_timeout: Duration,
    pub generation_timeout: Duration,
    pub scan_timeout: Duration,
    pub connector_timeout: Duration,
    pub ingest_concurrency: usize,
    pub cache_ttl: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".insightplan"),
            connectors_file: None,
            vector_store: VectorStoreKind::default(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            mock_embeddings: false,
            llm: LlmProvider::default(),
            lookup_timeout: crate::application::DEFAULT_LOOKUP_TIMEOUT,
            generation_timeout: crate::application::DEFAULT_GENERATION_TIMEOUT,
            scan_timeout: crate::application::DEFAULT_SCAN_TIMEOUT,
            connector_timeout: crate::application::DEFAULT_CONNECTOR_TIMEOUT,
            ingest_concurrency: crate::application::DEFAULT_INGEST_CONCURRENCY,
            cache_ttl: crate::connector::adapter::DEFAULT_CACHE_TTL,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {key}={raw}");
            None
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

impl PlannerConfig {
    /// Defaults overridden by `INSIGHTPLAN_*` variables and `QDRANT_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("INSIGHTPLAN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            connectors_file: std::env::var("INSIGHTPLAN_CONNECTORS").ok().map(PathBuf::from),
            vector_store: env_parse("INSIGHTPLAN_VECTOR_STORE").unwrap_or(defaults.vector_store),
            qdrant_url: std::env::var("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            mock_embeddings: env_parse("INSIGHTPLAN_MOCK_EMBEDDINGS").unwrap_or(false),
            llm: env_parse("INSIGHTPLAN_LLM").unwrap_or(defaults.llm),
            lookup_timeout: env_secs("INSIGHTPLAN_LOOKUP_TIMEOUT_SECS").unwrap_or(defaults.lookup_timeout),
            generation_timeout: env_secs("INSIGHTPLAN_GENERATION_TIMEOUT_SECS")
                .unwrap_or(defaults.generation_timeout),
            scan_timeout: env_secs("INSIGHTPLAN_SCAN_TIMEOUT_SECS").unwrap_or(defaults.scan_timeout),
            connector_timeout: env_secs("INSIGHTPLAN_CONNECTOR_TIMEOUT_SECS")
                .unwrap_or(defaults.connector_timeout),
            ingest_concurrency: env_parse("INSIGHTPLAN_INGEST_CONCURRENCY")
                .unwrap_or(defaults.ingest_concurrency),
            cache_ttl: env_secs("INSIGHTPLAN_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
        }
    }

    pub fn connectors_path(&self) -> PathBuf {
        self.connectors_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("connectors.json"))
    }
}

pub struct Container {
    config: PlannerConfig,
    registry: Arc<dyn ConnectorRegistry>,
    vector_repo: Arc<dyn VectorRepository>,
    planner: Arc<PlannerService>,
    context_generator: Arc<DomainContextGenerator>,
    ingestion: Arc<ContextIngestionService>,
    processor: Arc<QueryProcessor>,
}

impl Container {
    pub async fn new(config: PlannerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let embedding_service = Self::embedding_service(&config).await;
        let vector_repo = Self::vector_repository(&config);
        let generator = Self::text_generator(&config);
        let registry: Arc<dyn ConnectorRegistry> =
            Arc::new(StaticConnectorRegistry::from_file(config.connectors_path())?);

        let superset = Arc::new(SupersetClient::new());
        let postgres = Arc::new(PostgresClient::new());
        let scanners: Vec<Arc<dyn SchemaScanner>> = vec![
            superset.clone() as Arc<dyn SchemaScanner>,
            postgres.clone() as Arc<dyn SchemaScanner>,
            Arc::new(ConfigSchemaScanner::new()),
        ];
        let clients: Vec<Arc<dyn SourceClient>> = vec![
            superset as Arc<dyn SourceClient>,
            postgres as Arc<dyn SourceClient>,
        ];
        let cache: Arc<dyn ResultCache> = Arc::new(InMemoryResultCache::new(config.cache_ttl));

        let mut intents = ClassifyIntentUseCase::new().with_timeout(config.generation_timeout);
        let mut context_generator = DomainContextGenerator::new(registry.clone(), scanners)
            .with_scan_timeout(config.scan_timeout);
        if let Some(generator) = generator {
            intents = intents.with_generator(generator.clone());
            context_generator = context_generator.with_generator(generator);
        }
        let intents = Arc::new(intents);
        let context_generator = Arc::new(context_generator);

        let domains = Arc::new(
            ClassifyDomainUseCase::new(embedding_service.clone(), vector_repo.clone(), intents.clone())
                .with_timeout(config.lookup_timeout),
        );
        let planner = Arc::new(PlannerService::new(intents, domains));
        let ingestion = Arc::new(
            ContextIngestionService::new(
                embedding_service,
                vector_repo.clone(),
                registry.clone(),
                context_generator.clone(),
            )
            .with_concurrency(config.ingest_concurrency)
            .with_connector_timeout(config.connector_timeout),
        );
        let orchestrator = Arc::new(SourceOrchestrator::new(registry.clone(), clients).with_cache(cache));
        let processor = Arc::new(QueryProcessor::new(planner.clone(), orchestrator));

        Ok(Self {
            config,
            registry,
            vector_repo,
            planner,
            context_generator,
            ingestion,
            processor,
        })
    }

    async fn embedding_service(config: &PlannerConfig) -> Arc<dyn EmbeddingService> {
        if config.mock_embeddings {
            debug!("Using mock embedding service");
            return Arc::new(MockEmbedding::new());
        }
        let ollama = OllamaEmbedding::from_env();
        match ollama.health().await {
            Ok(()) => {
                debug!("Using Ollama embeddings ({})", ollama.config().model_name());
                Arc::new(ollama)
            }
            Err(e) => {
                warn!("Ollama embeddings unavailable ({e}). Falling back to mock embeddings.");
                Arc::new(MockEmbedding::new())
            }
        }
    }

    fn vector_repository(config: &PlannerConfig) -> Arc<dyn VectorRepository> {
        match config.vector_store {
            VectorStoreKind::Memory => {
                debug!("Using in-memory vector storage");
                Arc::new(InMemoryVectorRepository::new())
            }
            VectorStoreKind::Qdrant => {
                debug!("Using Qdrant at {}", config.qdrant_url);
                Arc::new(QdrantVectorRepository::new(&config.qdrant_url))
            }
            VectorStoreKind::Duckdb => {
                let db_path = config.data_dir.join("insightplan.duckdb");
                match DuckdbVectorRepository::new(&db_path) {
                    Ok(duckdb) => {
                        debug!("Using DuckDB vector storage at {:?}", db_path);
                        Arc::new(duckdb)
                    }
                    Err(e) => {
                        warn!(
                            "Failed to open DuckDB ({}): {}. Falling back to in-memory storage.",
                            db_path.display(),
                            e
                        );
                        Arc::new(InMemoryVectorRepository::new())
                    }
                }
            }
        }
    }

    fn text_generator(config: &PlannerConfig) -> Option<Arc<dyn TextGenerator>> {
        match config.llm {
            LlmProvider::None => None,
            LlmProvider::Ollama => Some(Arc::new(OllamaGenerator::from_env())),
            LlmProvider::Anthropic | LlmProvider::Auto => match AnthropicClient::from_env() {
                Some(client) => Some(Arc::new(client)),
                None => {
                    if config.llm == LlmProvider::Anthropic {
                        warn!("ANTHROPIC_API_KEY is not set; generative fallback disabled");
                    }
                    None
                }
            },
        }
    }

    /// Seeds the built-in domains when the collection is still empty.
    pub async fn warm_up(&self, cancel: &CancellationToken) -> Result<Option<IngestionReport>> {
        if self.vector_repo.count(DOMAIN_COLLECTION).await? > 0 {
            return Ok(None);
        }
        info!("Domain collection is empty, seeding built-in contexts");
        Ok(Some(self.ingestion.ingest_domain_contexts(cancel).await?))
    }

    pub fn planner(&self) -> Arc<PlannerService> {
        self.planner.clone()
    }

    pub fn context_generator(&self) -> Arc<DomainContextGenerator> {
        self.context_generator.clone()
    }

    pub fn ingestion(&self) -> Arc<ContextIngestionService> {
        self.ingestion.clone()
    }

    pub fn processor(&self) -> Arc<QueryProcessor> {
        self.processor.clone()
    }

    pub fn registry(&self) -> Arc<dyn ConnectorRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_provider_names_parse() {
        assert_eq!("Memory".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Memory);
        assert_eq!("qdrant".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Qdrant);
        assert!("redis".parse::<VectorStoreKind>().is_err());
        assert_eq!("off".parse::<LlmProvider>().unwrap(), LlmProvider::None);
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
    }

    #[tokio::test]
    async fn memory_container_seeds_builtin_domains_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig {
            data_dir: dir.path().to_path_buf(),
            vector_store: VectorStoreKind::Memory,
            mock_embeddings: true,
            llm: LlmProvider::None,
            ..PlannerConfig::default()
        };
        let container = Container::new(config).await.unwrap();
        let cancel = CancellationToken::new();

        let first = container.warm_up(&cancel).await.unwrap().unwrap();
        assert_eq!(first.ingested.len(), 6);
        assert!(container.warm_up(&cancel).await.unwrap().is_none());
        assert!(container.registry().list_connectors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn postgres_connectors_are_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let connectors = dir.path().join("connectors.json");
        std::fs::write(
            &connectors,
            r#"[{"id": "pg", "name": "Warehouse", "type": "postgres", "status": "connected",
                 "config": {"tables": [{"name": "orders", "columns": [
                     {"name": "order_id", "type": "integer"},
                     {"name": "total_amount", "type": "numeric"}]}]}}]"#,
        )
        .unwrap();
        let config = PlannerConfig {
            data_dir: dir.path().to_path_buf(),
            connectors_file: Some(connectors),
            vector_store: VectorStoreKind::Memory,
            mock_embeddings: true,
            llm: LlmProvider::None,
            ..PlannerConfig::default()
        };
        let container = Container::new(config).await.unwrap();

        let report = container
            .ingestion()
            .ingest_connector_contexts("pg", &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
        assert!(!report.ingested.is_empty());
    }
}
