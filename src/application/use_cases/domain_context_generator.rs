use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::deadline::bounded;
use crate::application::{ConnectorRegistry, SchemaScanner, TextGenerator};
use crate::domain::{
    ContextSynthesizer, DomainContext, DomainError, IntentType, QueryPattern, SchemaContext,
};

pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(20);

/// Scans a connector's schema and summarizes it into business-domain contexts.
pub struct DomainContextGenerator {
    registry: Arc<dyn ConnectorRegistry>,
    scanners: Vec<Arc<dyn SchemaScanner>>,
    generator: Option<Arc<dyn TextGenerator>>,
    synthesizer: ContextSynthesizer,
    scan_timeout: Duration,
    suggestion_timeout: Duration,
}

impl DomainContextGenerator {
    pub fn new(registry: Arc<dyn ConnectorRegistry>, scanners: Vec<Arc<dyn SchemaScanner>>) -> Self {
        Self {
            registry,
            scanners,
            generator: None,
            synthesizer: ContextSynthesizer::new(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        }
    }

    /// Enables generated example questions on top of the templated ones.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub async fn analyze_business_context(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SchemaContext, DomainError> {
        let connector = self.registry.get_connector(connector_id).await?;
        let connector_type = connector.connector_type();
        let scanner = self
            .scanners
            .iter()
            .find(|s| s.supports(connector_type))
            .ok_or_else(|| {
                DomainError::schema_scan(format!(
                    "no schema scanner for {} connector {}",
                    connector_type.as_str(),
                    connector.id()
                ))
            })?;

        let tables = bounded(cancel, self.scan_timeout, "schema scan", scanner.scan(&connector))
            .await
            .map_err(|e| match e {
                DomainError::Cancelled(_) | DomainError::SchemaScanError(_) => e,
                other => DomainError::schema_scan(format!("{}: {other}", connector.id())),
            })?;
        debug!("Scanned {} tables from connector {}", tables.len(), connector.id());

        let mut schema = self.synthesizer.analyze(&connector, tables, Utc::now());
        self.enhance(&mut schema, cancel).await?;

        info!(
            "Analyzed connector {}: primary domain {} ({:.2}), {} domains, {} metrics",
            schema.connector_id,
            schema.primary_domain,
            schema.confidence,
            schema.detected_domains.len(),
            schema.business_metrics.len()
        );
        Ok(schema)
    }

    pub async fn domain_contexts(
        &self,
        connector_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DomainContext>, DomainError> {
        Ok(self
            .analyze_business_context(connector_id, cancel)
            .await?
            .detected_domains)
    }

    /// Adds generated example questions. Anything short of usable output leaves the schema untouched.
    async fn enhance(&self, schema: &mut SchemaContext, cancel: &CancellationToken) -> Result<(), DomainError> {
        let Some(generator) = &self.generator else {
            return Ok(());
        };

        let prompt = self.synthesizer.suggestion_prompt(schema);
        let response = match bounded(cancel, self.suggestion_timeout, "query suggestions", generator.generate(&prompt)).await {
            Ok(response) => response,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Skipping generated query suggestions for {}: {e}", schema.connector_id);
                return Ok(());
            }
        };

        let suggestions = self.synthesizer.parse_suggestions(&response);
        if suggestions.is_empty() {
            debug!("Generator {} returned no usable suggestions", generator.model_name());
            return Ok(());
        }

        for suggestion in &suggestions {
            if !schema.sample_queries.contains(suggestion) {
                schema.sample_queries.push(suggestion.clone());
            }
        }
        let primary = schema.primary_domain.clone();
        if let Some(context) = schema.detected_domains.iter_mut().find(|c| c.domain == primary) {
            context.query_patterns.push(QueryPattern {
                pattern: format!("{primary} suggested questions"),
                description: format!("Generated example questions for {primary} data"),
                intent: IntentType::Analytics,
                keywords: context.keywords.iter().take(5).cloned().collect(),
                examples: suggestions,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnInfo, Connector, ConnectorStatus, ConnectorType, Domain, TableContext};
    use async_trait::async_trait;

    struct OneConnector(Connector);

    #[async_trait]
    impl ConnectorRegistry for OneConnector {
        async fn list_connectors(&self) -> Result<Vec<Connector>, DomainError> {
            Ok(vec![self.0.clone()])
        }

        async fn get_connector(&self, id: &str) -> Result<Connector, DomainError> {
            if id == self.0.id() {
                Ok(self.0.clone())
            } else {
                Err(DomainError::not_found(format!("connector {id}")))
            }
        }
    }

    struct ShopScanner;

    #[async_trait]
    impl SchemaScanner for ShopScanner {
        fn supports(&self, connector_type: ConnectorType) -> bool {
            connector_type == ConnectorType::Postgres
        }

        async fn scan(&self, _connector: &Connector) -> Result<Vec<TableContext>, DomainError> {
            Ok(vec![
                TableContext::new(
                    "orders",
                    vec![
                        ColumnInfo::infer("id", "integer"),
                        ColumnInfo::infer("total_amount", "decimal"),
                        ColumnInfo::infer("region", "varchar"),
                    ],
                ),
                TableContext::new("audit_log", vec![ColumnInfo::infer("message", "text")]),
            ])
        }
    }

    struct Suggestions(&'static str);

    #[async_trait]
    impl TextGenerator for Suggestions {
        async fn generate(&self, _prompt: &str) -> Result<String, DomainError> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "suggestions"
        }
    }

    fn generator(connector_type: ConnectorType) -> DomainContextGenerator {
        let connector = Connector::new("pg", "Warehouse", connector_type, ConnectorStatus::Connected);
        DomainContextGenerator::new(Arc::new(OneConnector(connector)), vec![Arc::new(ShopScanner)])
    }

    #[tokio::test]
    async fn groups_tables_into_domains() {
        let schema = generator(ConnectorType::Postgres)
            .analyze_business_context("pg", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(schema.primary_domain, Domain::SALES);
        let domains: Vec<&str> = schema.detected_domains.iter().map(|c| c.domain.as_str()).collect();
        assert!(domains.contains(&"sales"));
        assert!(domains.contains(&"general"));
        for context in &schema.detected_domains {
            assert!((0.3..=1.0).contains(&context.confidence));
        }
    }

    #[tokio::test]
    async fn unsupported_connector_type_is_a_scan_failure() {
        let err = generator(ConnectorType::Mongodb)
            .analyze_business_context("pg", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SchemaScanError(_)));
    }

    #[tokio::test]
    async fn unknown_connector_is_not_found() {
        let err = generator(ConnectorType::Postgres)
            .domain_contexts("missing", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn only_query_shaped_suggestions_are_kept() {
        let generator = generator(ConnectorType::Postgres).with_generator(Arc::new(Suggestions(
            "Here are some ideas:\n1. What is total revenue by region?\n2. ok\n3. Show orders per month",
        )));
        let schema = generator
            .analyze_business_context("pg", &CancellationToken::new())
            .await
            .unwrap();

        assert!(schema.sample_queries.contains(&"What is total revenue by region?".to_string()));
        assert!(schema.sample_queries.contains(&"Show orders per month".to_string()));
        assert!(!schema.sample_queries.contains(&"ok".to_string()));
        let sales = schema
            .detected_domains
            .iter()
            .find(|c| c.domain == Domain::SALES)
            .unwrap();
        assert!(sales.query_patterns.iter().any(|p| p.examples.len() == 2));
    }
}
