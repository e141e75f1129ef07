use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::deadline::bounded;
use crate::application::{ConnectorRegistry, ResultCache, SourceClient};
use crate::domain::{
    Connector, DomainError, DomainHint, IntentType, Query, RetrievalOutcome, RetrievalStrategy,
    Row, SourceResult,
};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

const SAMPLE_LABEL: &str = "sample";

const STOP_WORDS: &[&str] = &[
    "give", "me", "the", "a", "an", "from", "on", "in", "of", "to", "show", "get", "find", "what",
    "how", "is", "are", "was", "were", "be", "have", "has", "had", "do", "does", "did", "will",
    "would", "should", "could", "data", "and", "for", "by", "with", "all",
];

/// Pulls rows for a planned query from every relevant connector.
///
/// Each connector gets the query-specific strategies first and a
/// representative sample last. Rows are only ever what sources return.
pub struct SourceOrchestrator {
    registry: Arc<dyn ConnectorRegistry>,
    clients: Vec<Arc<dyn SourceClient>>,
    cache: Option<Arc<dyn ResultCache>>,
    attempt_timeout: Duration,
    source_timeout: Duration,
    sample_limit: usize,
}

impl SourceOrchestrator {
    pub fn new(registry: Arc<dyn ConnectorRegistry>, clients: Vec<Arc<dyn SourceClient>>) -> Self {
        Self {
            registry,
            clients,
            cache: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeouts(mut self, attempt: Duration, source: Duration) -> Self {
        self.attempt_timeout = attempt;
        self.source_timeout = source;
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub async fn retrieve(
        &self,
        query: &Query,
        intent: IntentType,
        hint: Option<&DomainHint>,
        cancel: &CancellationToken,
    ) -> Result<RetrievalOutcome, DomainError> {
        let wanted = query.connector_ids();
        let connectors: Vec<Connector> = self
            .registry
            .list_connectors()
            .await?
            .into_iter()
            .filter(|c| c.is_connected())
            .filter(|c| wanted.is_empty() || wanted.iter().any(|id| id == c.id()))
            .collect();
        if connectors.is_empty() {
            return Err(DomainError::no_data("no connected data sources are configured"));
        }

        let lowered = query.normalized();
        let candidates = select_candidates(connectors, intent, &lowered);
        if candidates.is_empty() {
            return Err(DomainError::no_data(format!(
                "no connected data source can answer {intent} queries"
            )));
        }
        let keywords = extract_keywords(&lowered);
        debug!(
            "Retrieving for {intent} from {} candidates with keywords {:?}",
            candidates.len(),
            keywords
        );

        let mut outcome = RetrievalOutcome {
            rows: Vec::new(),
            sources: Vec::new(),
            attempted: Vec::new(),
            domain_aware: hint.is_some(),
        };

        for connector in &candidates {
            if cancel.is_cancelled() {
                return Err(DomainError::cancelled("source retrieval"));
            }
            outcome.attempted.push(connector.id().to_string());

            let Some(client) = self.clients.iter().find(|c| c.supports(connector.connector_type())) else {
                debug!("No source client for {} connector {}", connector.connector_type().as_str(), connector.id());
                continue;
            };
            let strategies = plan_strategies(connector, &keywords, hint);

            let fetched = bounded(
                cancel,
                self.source_timeout,
                "connector retrieval",
                self.fetch_from(connector, client.as_ref(), &strategies, cancel),
            )
            .await;

            match fetched {
                Ok(Some((strategy, rows))) => {
                    info!("{} returned {} rows via {strategy}", connector.id(), rows.len());
                    outcome.sources.push(SourceResult {
                        connector_id: connector.id().to_string(),
                        connector_name: connector.name().to_string(),
                        strategy,
                        row_count: rows.len(),
                    });
                    outcome.rows.extend(rows);
                }
                Ok(None) => debug!("{} had no rows for this query", connector.id()),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!("Skipping connector {}: {e}", connector.id()),
            }
        }

        if outcome.rows.is_empty() {
            return Err(DomainError::no_data(format!(
                "none of {} data sources returned rows",
                outcome.attempted.len()
            )));
        }
        Ok(outcome)
    }

    /// First non-empty strategy result, else the representative sample.
    async fn fetch_from(
        &self,
        connector: &Connector,
        client: &dyn SourceClient,
        strategies: &[RetrievalStrategy],
        cancel: &CancellationToken,
    ) -> Result<Option<(String, Vec<Row>)>, DomainError> {
        for strategy in strategies {
            let label = strategy.label();
            let rows = self
                .attempt(
                    &strategy_cache_key(connector, strategy),
                    &label,
                    cancel,
                    client.fetch(connector, strategy),
                )
                .await?;
            if !rows.is_empty() {
                return Ok(Some((label, rows)));
            }
        }

        let rows = self
            .attempt(
                &sample_cache_key(connector, self.sample_limit),
                SAMPLE_LABEL,
                cancel,
                client.fetch_sample(connector, self.sample_limit),
            )
            .await?;
        Ok((!rows.is_empty()).then(|| (SAMPLE_LABEL.to_string(), rows)))
    }

    /// One bounded fetch. Source errors and timeouts count as empty; cancellation does not.
    async fn attempt<F>(
        &self,
        key: &str,
        label: &str,
        cancel: &CancellationToken,
        fetch: F,
    ) -> Result<Vec<Row>, DomainError>
    where
        F: std::future::Future<Output = Result<Vec<Row>, DomainError>>,
    {
        if let Some(cache) = &self.cache {
            if let Some(rows) = cache.get(key).await {
                debug!("Cache hit for {key}");
                return Ok(rows);
            }
        }

        match bounded(cancel, self.attempt_timeout, label, fetch).await {
            Ok(rows) => {
                if let Some(cache) = &self.cache {
                    if !rows.is_empty() {
                        cache.put(key, rows.clone()).await;
                    }
                }
                Ok(rows)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("{key} failed: {e}");
                Ok(Vec::new())
            }
        }
    }
}

/// Cache key covering the connector and the whole strategy, keywords included.
pub fn strategy_cache_key(connector: &Connector, strategy: &RetrievalStrategy) -> String {
    let detail = match strategy {
        RetrievalStrategy::MatchingDashboard { keywords } | RetrievalStrategy::MatchingDataset { keywords } => {
            keywords.join(" ")
        }
        RetrievalStrategy::Table { .. } => String::new(),
    };
    format!("{}:{}:{detail}", connector.id(), strategy.label())
}

pub fn sample_cache_key(connector: &Connector, limit: usize) -> String {
    format!("{}:{SAMPLE_LABEL}:{limit}", connector.id())
}

/// Orders and filters connectors by what the intent needs from them.
pub fn select_candidates(connectors: Vec<Connector>, intent: IntentType, query: &str) -> Vec<Connector> {
    match intent {
        IntentType::Visualization => {
            let (mut dashboards, others): (Vec<_>, Vec<_>) = connectors
                .into_iter()
                .partition(|c| c.connector_type().supports_dashboards());
            dashboards.extend(others);
            dashboards
        }
        IntentType::Sql => connectors
            .into_iter()
            .filter(|c| c.connector_type().supports_direct_query())
            .collect(),
        IntentType::Comparison | IntentType::Trend => connectors,
        _ => {
            let relevant: Vec<Connector> = connectors
                .iter()
                .filter(|c| {
                    c.connector_type()
                        .relevance_keywords()
                        .iter()
                        .any(|k| query.contains(k))
                })
                .cloned()
                .collect();
            if relevant.is_empty() {
                connectors
            } else {
                relevant
            }
        }
    }
}

/// Dashboard match, dataset match, then each hinted table.
pub fn plan_strategies(
    connector: &Connector,
    keywords: &[String],
    hint: Option<&DomainHint>,
) -> Vec<RetrievalStrategy> {
    let mut strategies = Vec::new();
    if !keywords.is_empty() {
        if connector.connector_type().supports_dashboards() {
            strategies.push(RetrievalStrategy::MatchingDashboard {
                keywords: keywords.to_vec(),
            });
        }
        strategies.push(RetrievalStrategy::MatchingDataset {
            keywords: keywords.to_vec(),
        });
    }
    if let Some(hint) = hint {
        for table in &hint.tables {
            strategies.push(RetrievalStrategy::Table { name: table.clone() });
        }
    }
    strategies
}

/// Content words of a query: lowercased, punctuation trimmed, stop words and short words dropped.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let word = word
            .trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\'' | '"'))
            .to_lowercase();
        if word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()) && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectorStatus, ConnectorType, Domain};

    fn connector(id: &str, connector_type: ConnectorType) -> Connector {
        Connector::new(id, id, connector_type, ConnectorStatus::Connected)
    }

    fn ids(connectors: &[Connector]) -> Vec<&str> {
        connectors.iter().map(Connector::id).collect()
    }

    #[test]
    fn keywords_drop_stop_words_and_punctuation() {
        assert_eq!(
            extract_keywords("Show me the World Bank's health data, please!"),
            vec!["world", "bank's", "health", "please"]
        );
        assert!(extract_keywords("show me the data").is_empty());
    }

    #[test]
    fn visualization_prefers_dashboards() {
        let candidates = select_candidates(
            vec![
                connector("pg", ConnectorType::Postgres),
                connector("bi", ConnectorType::Superset),
            ],
            IntentType::Visualization,
            "chart revenue",
        );
        assert_eq!(ids(&candidates), vec!["bi", "pg"]);
    }

    #[test]
    fn sql_keeps_direct_query_sources_only() {
        let candidates = select_candidates(
            vec![
                connector("bi", ConnectorType::Superset),
                connector("pg", ConnectorType::Postgres),
                connector("my", ConnectorType::Mysql),
            ],
            IntentType::Sql,
            "select * from orders",
        );
        assert_eq!(ids(&candidates), vec!["pg", "my"]);
    }

    #[test]
    fn analytics_falls_back_to_all_when_nothing_is_relevant() {
        let all = vec![
            connector("bi", ConnectorType::Superset),
            connector("api", ConnectorType::Api),
        ];
        let candidates = select_candidates(all, IntentType::Analytics, "zzz qqq");
        assert_eq!(ids(&candidates), vec!["bi", "api"]);
    }

    #[test]
    fn strategies_follow_priority_order() {
        let hint = DomainHint {
            domain: Domain::SALES,
            tables: vec!["orders".into(), "products".into()],
            keywords: vec!["sales".into()],
        };
        let keywords = vec!["sales".to_string()];

        let labels: Vec<String> = plan_strategies(&connector("bi", ConnectorType::Superset), &keywords, Some(&hint))
            .iter()
            .map(RetrievalStrategy::label)
            .collect();
        assert_eq!(
            labels,
            vec!["matching_dashboard", "matching_dataset", "table:orders", "table:products"]
        );

        let labels: Vec<String> = plan_strategies(&connector("pg", ConnectorType::Postgres), &keywords, None)
            .iter()
            .map(RetrievalStrategy::label)
            .collect();
        assert_eq!(labels, vec!["matching_dataset"]);
    }

    #[test]
    fn cache_keys_include_keywords() {
        let pg = connector("pg", ConnectorType::Postgres);
        let revenue = RetrievalStrategy::MatchingDataset {
            keywords: vec!["revenue".into(), "region".into()],
        };
        let headcount = RetrievalStrategy::MatchingDataset {
            keywords: vec!["employee".into(), "headcount".into()],
        };
        assert_eq!(strategy_cache_key(&pg, &revenue), "pg:matching_dataset:revenue region");
        assert_ne!(strategy_cache_key(&pg, &revenue), strategy_cache_key(&pg, &headcount));
        assert_eq!(sample_cache_key(&pg, 100), "pg:sample:100");
    }
}
