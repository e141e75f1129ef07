pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::{Commands, IngestTarget, OutputFormat};

pub use application::{
    ClassifyDomainUseCase, ClassifyIntentUseCase, ConnectorRegistry, ContextIngestionService,
    DomainContextGenerator, EmbeddingService, PlannerService, QueryOutcome, QueryProcessor,
    ResultCache, SchemaScanner, SourceClient, SourceOrchestrator, TextGenerator, VectorRepository,
    DOMAIN_COLLECTION,
};

pub use connector::{
    AnthropicClient, ConfigSchemaScanner, Container, DuckdbVectorRepository, InMemoryResultCache,
    InMemoryVectorRepository, MockEmbedding, OllamaEmbedding, OllamaGenerator, PlannerConfig,
    PostgresClient,
    QdrantVectorRepository, Router, StaticConnectorRegistry, SupersetClient,
};

pub use domain::{
    ClassificationResult, ClassificationSource, Connector, ConnectorStatus, ConnectorType, Domain,
    DomainContext, DomainError, DomainHint, Embedding, EmbeddingConfig, IngestionReport, Intent,
    IntentType, PlanResponse, Query, RetrievalOutcome, RetrievalStrategy, Row, SchemaContext,
    TaskGraph, TaskStatus, TaskStep, TaskStepType, VectorMatch, VectorRecord,
};
