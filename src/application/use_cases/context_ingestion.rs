use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::classify_domain::DOMAIN_COLLECTION;
use super::deadline::bounded;
use super::domain_context_generator::DomainContextGenerator;
use crate::application::{ConnectorRegistry, EmbeddingService, VectorRepository};
use crate::domain::{
    builtin_contexts, Connector, DomainContext, DomainError, IngestionFailure, IngestionReport,
    VectorRecord,
};

pub const DEFAULT_INGEST_CONCURRENCY: usize = 4;
pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Keeps the `domain_contexts` collection in step with the built-in and connector-derived contexts.
///
/// Every domain maps to exactly one record keyed `domain_<label>`, so re-running
/// any operation overwrites instead of duplicating.
pub struct ContextIngestionService {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_repo: Arc<dyn VectorRepository>,
    registry: Arc<dyn ConnectorRegistry>,
    generator: Arc<DomainContextGenerator>,
    collection: String,
    concurrency: usize,
    connector_timeout: Duration,
}

impl ContextIngestionService {
    pub fn new(
        embedding_service: Arc<dyn EmbeddingService>,
        vector_repo: Arc<dyn VectorRepository>,
        registry: Arc<dyn ConnectorRegistry>,
        generator: Arc<DomainContextGenerator>,
    ) -> Self {
        Self {
            embedding_service,
            vector_repo,
            registry,
            generator,
            collection: DOMAIN_COLLECTION.to_string(),
            concurrency: DEFAULT_INGEST_CONCURRENCY,
            connector_timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_connector_timeout(mut self, timeout: Duration) -> Self {
        self.connector_timeout = timeout;
        self
    }

    /// Writes the hand-curated contexts. A failing domain is reported and the rest still land.
    pub async fn ingest_domain_contexts(&self, cancel: &CancellationToken) -> Result<IngestionReport, DomainError> {
        self.ensure_collection().await;

        let mut report = IngestionReport::default();
        for context in builtin_contexts(Utc::now()) {
            if cancel.is_cancelled() {
                return Err(DomainError::cancelled("built-in context ingestion"));
            }
            match self.ingest_context(&context, None).await {
                Ok(key) => report.ingested.push(key),
                Err(e) => {
                    warn!("Failed to ingest built-in {} context: {e}", context.domain);
                    report.failures.push(IngestionFailure {
                        connector_id: "builtin".to_string(),
                        connector_name: context.domain.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!("Built-in domain ingestion: {}", report.summary());
        Ok(report)
    }

    /// Analyzes one connector and writes one record per detected domain.
    pub async fn ingest_connector_contexts(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport, DomainError> {
        self.ensure_collection().await;
        self.ingest_connector(connector_id, cancel).await
    }

    /// Sweeps every connected connector with bounded concurrency.
    ///
    /// Disconnected connectors are skipped and per-connector failures are
    /// reported without stopping the sweep. Only cancellation aborts it.
    pub async fn ingest_all_connector_contexts(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport, DomainError> {
        let connectors = self.registry.list_connectors().await?;
        self.ensure_collection().await;

        let mut report = IngestionReport::default();
        let (connected, skipped): (Vec<Connector>, Vec<Connector>) =
            connectors.into_iter().partition(Connector::is_connected);
        for connector in skipped {
            debug!("Skipping connector {} ({})", connector.id(), connector.status().as_str());
            report.skipped.push(connector.id().to_string());
        }

        let sweeps = connected
            .into_iter()
            .map(|connector| self.ingest_with_deadline(connector, cancel));
        let results: Vec<(Connector, Result<IngestionReport, DomainError>)> = stream::iter(sweeps)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (connector, result) in results {
            match result {
                Ok(partial) => report.merge(partial),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!("Context ingestion failed for connector {}: {e}", connector.id());
                    report.failures.push(IngestionFailure {
                        connector_id: connector.id().to_string(),
                        connector_name: connector.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.ingested.sort();
        report.ingested.dedup();
        report.failures.sort_by(|a, b| a.connector_id.cmp(&b.connector_id));

        info!("Connector context ingestion: {}", report.summary());
        Ok(report)
    }

    /// Re-analyzes a connector after its schema changed.
    pub async fn refresh_connector_context(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport, DomainError> {
        info!("Refreshing domain contexts for connector {connector_id}");
        self.ingest_connector_contexts(connector_id, cancel).await
    }

    /// Runs built-in then all-connector ingestion in the background.
    pub fn spawn_startup_ingestion(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<IngestionReport> {
        tokio::spawn(async move {
            let mut report = IngestionReport::default();
            match self.ingest_domain_contexts(&cancel).await {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    warn!("Startup ingestion stopped: {e}");
                    return report;
                }
            }
            match self.ingest_all_connector_contexts(&cancel).await {
                Ok(partial) => report.merge(partial),
                Err(e) => warn!("Startup connector ingestion stopped: {e}"),
            }
            info!("Startup ingestion finished: {}", report.summary());
            report
        })
    }

    async fn ingest_with_deadline(
        &self,
        connector: Connector,
        cancel: &CancellationToken,
    ) -> (Connector, Result<IngestionReport, DomainError>) {
        let result = bounded(
            cancel,
            self.connector_timeout,
            "connector ingestion",
            self.ingest_connector(connector.id(), cancel),
        )
        .await;
        (connector, result)
    }

    async fn ingest_connector(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestionReport, DomainError> {
        let contexts = self.generator.domain_contexts(connector_id, cancel).await?;

        let mut report = IngestionReport::default();
        for context in &contexts {
            if cancel.is_cancelled() {
                return Err(DomainError::cancelled("connector context ingestion"));
            }
            match self.ingest_context(context, Some(connector_id)).await {
                Ok(key) => report.ingested.push(key),
                Err(e) => {
                    warn!("Failed to ingest {} context from {connector_id}: {e}", context.domain);
                    report.failures.push(IngestionFailure {
                        connector_id: connector_id.to_string(),
                        connector_name: context.domain.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        debug!("Connector {connector_id}: {}", report.summary());
        Ok(report)
    }

    async fn ensure_collection(&self) {
        let dimension = self.embedding_service.dimension();
        if let Err(e) = self.vector_repo.create_collection(&self.collection, dimension).await {
            warn!("Could not create collection {}: {e}", self.collection);
        }
    }

    async fn ingest_context(
        &self,
        context: &DomainContext,
        connector_id: Option<&str>,
    ) -> Result<String, DomainError> {
        let key = context.domain.vector_key();
        let embedding = self.embedding_service.embed(&context.search_text()).await?;
        let record = VectorRecord::new(
            key.clone(),
            embedding.into_vector(),
            context_metadata(context, connector_id),
        );
        self.vector_repo.upsert(&self.collection, record).await?;
        debug!("Upserted {key} into {}", self.collection);
        Ok(key)
    }
}

fn context_metadata(context: &DomainContext, connector_id: Option<&str>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("type".into(), json!("domain_context"));
    metadata.insert("domain".into(), json!(context.domain.as_str()));
    metadata.insert("description".into(), json!(context.description));
    metadata.insert("keywords".into(), json!(context.keywords));
    metadata.insert("metrics".into(), json!(context.metrics));
    metadata.insert("dimensions".into(), json!(context.dimensions));
    metadata.insert("tables".into(), json!(context.table_names()));
    metadata.insert("table_count".into(), json!(context.tables.len()));
    metadata.insert("confidence".into(), json!(context.confidence));
    metadata.insert("auto_generated".into(), json!(context.auto_generated));
    if let Some(id) = connector_id {
        metadata.insert("connector_id".into(), json!(id));
    }
    metadata.insert("updated_at".into(), json!(context.last_updated.to_rfc3339()));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, GlossaryTerm, TableContext};

    #[test]
    fn metadata_carries_context_summary() {
        let context = DomainContext {
            domain: Domain::SALES,
            description: "Sales data".into(),
            keywords: vec!["orders".into()],
            metrics: vec!["total_amount".into()],
            dimensions: vec!["region".into()],
            tables: vec![TableContext::new("orders", vec![])],
            glossary: vec![GlossaryTerm {
                term: "Revenue".into(),
                definition: "Income".into(),
                synonyms: vec![],
                domain: Domain::SALES,
            }],
            query_patterns: vec![],
            confidence: 0.7,
            last_updated: Utc::now(),
            auto_generated: true,
        };

        let metadata = context_metadata(&context, Some("pg"));
        assert_eq!(metadata["type"], json!("domain_context"));
        assert_eq!(metadata["domain"], json!("sales"));
        assert_eq!(metadata["tables"], json!(["orders"]));
        assert_eq!(metadata["table_count"], json!(1));
        assert_eq!(metadata["connector_id"], json!("pg"));
        assert!(!context_metadata(&context, None).contains_key("connector_id"));
    }
}
