use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::{SchemaScanner, SourceClient};
use crate::domain::{
    ColumnInfo, Connector, ConnectorType, DomainError, RetrievalStrategy, Row, TableContext,
};

pub const DEFAULT_ROW_LIMIT: usize = 100;
const DEFAULT_DATABASE_ID: i64 = 1;

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    result: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct DetailResponse {
    #[serde(default)]
    result: Map<String, Value>,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Deserialize)]
struct SqlLabResponse {
    #[serde(default)]
    data: Vec<Row>,
    #[serde(default)]
    error: Option<String>,
}

/// Superset REST client: dataset scanning for context generation and
/// dashboard, dataset and SQL Lab retrieval for the orchestrator.
///
/// Connector config keys: `base_url`, `username`, `password`, optional
/// `token` (skips login), `database_id` and `row_limit`.
pub struct SupersetClient {
    client: reqwest::Client,
    tokens: RwLock<HashMap<String, String>>,
}

impl Default for SupersetClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SupersetClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    fn base_url(connector: &Connector) -> Result<String, DomainError> {
        connector
            .config_str("base_url")
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                DomainError::invalid_input(format!(
                    "Superset connector {} has no base_url",
                    connector.id()
                ))
            })
    }

    fn database_id(connector: &Connector) -> i64 {
        connector
            .config()
            .get("database_id")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_DATABASE_ID)
    }

    fn row_limit(connector: &Connector) -> usize {
        connector
            .config()
            .get("row_limit")
            .and_then(Value::as_u64)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_ROW_LIMIT)
    }

    async fn token(&self, connector: &Connector) -> Result<String, DomainError> {
        if let Some(token) = connector.config_str("token") {
            return Ok(token.to_string());
        }
        if let Some(token) = self.tokens.read().await.get(connector.id()) {
            return Ok(token.clone());
        }

        let base = Self::base_url(connector)?;
        let body = json!({
            "username": connector.config_str("username").unwrap_or_default(),
            "password": connector.config_str("password").unwrap_or_default(),
            "provider": "db",
        });
        let response = self
            .client
            .post(format!("{base}/api/v1/security/login"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::source(format!("Superset login failed: {e}")))?;
        if !response.status().is_success() {
            return Err(DomainError::source(format!(
                "Superset login for {} returned {}",
                connector.id(),
                response.status()
            )));
        }
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| DomainError::parse(format!("Invalid Superset login response: {e}")))?;
        if login.access_token.is_empty() {
            return Err(DomainError::source("Superset returned no access token"));
        }

        info!("Authenticated with Superset connector {}", connector.id());
        self.tokens
            .write()
            .await
            .insert(connector.id().to_string(), login.access_token.clone());
        Ok(login.access_token)
    }

    /// Drops the cached login token after a 401 so the next call logs in again.
    async fn check_auth(&self, connector: &Connector, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED
            && self.tokens.write().await.remove(connector.id()).is_some()
        {
            info!("Superset token for {} was rejected, will log in again", connector.id());
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        connector: &Connector,
        path: &str,
    ) -> Result<T, DomainError> {
        let base = Self::base_url(connector)?;
        let token = self.token(connector).await?;
        let response = self
            .client
            .get(format!("{base}{path}"))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DomainError::source(format!("Superset GET {path} failed: {e}")))?;
        if !response.status().is_success() {
            self.check_auth(connector, response.status()).await;
            return Err(DomainError::source(format!(
                "Superset GET {path} returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| DomainError::parse(format!("Invalid Superset response for {path}: {e}")))
    }

    async fn execute_sql(&self, connector: &Connector, sql: &str) -> Result<Vec<Row>, DomainError> {
        let base = Self::base_url(connector)?;
        let token = self.token(connector).await?;
        debug!("Superset SQL Lab on {}: {sql}", connector.id());
        let response = self
            .client
            .post(format!("{base}/api/v1/sqllab/execute/"))
            .bearer_auth(token)
            .json(&json!({ "sql": sql, "database_id": Self::database_id(connector) }))
            .send()
            .await
            .map_err(|e| DomainError::source(format!("Superset SQL Lab request failed: {e}")))?;
        if !response.status().is_success() {
            self.check_auth(connector, response.status()).await;
            return Err(DomainError::source(format!(
                "Superset SQL Lab returned {}",
                response.status()
            )));
        }
        let result: SqlLabResponse = response
            .json()
            .await
            .map_err(|e| DomainError::parse(format!("Invalid SQL Lab response: {e}")))?;
        if let Some(error) = result.error.filter(|e| !e.is_empty()) {
            return Err(DomainError::source(format!("SQL Lab error: {error}")));
        }
        Ok(result.data)
    }

    async fn select_table(
        &self,
        connector: &Connector,
        table: &str,
        limit: usize,
    ) -> Result<Vec<Row>, DomainError> {
        if !is_safe_table_name(table) {
            return Err(DomainError::invalid_input(format!("Refusing to query table '{table}'")));
        }
        self.execute_sql(connector, &format!("SELECT * FROM {table} LIMIT {limit}"))
            .await
    }

    async fn datasets(&self, connector: &Connector) -> Result<Vec<Map<String, Value>>, DomainError> {
        let list: ListResponse = self.get_json(connector, "/api/v1/dataset/").await?;
        Ok(list.result)
    }

    async fn dashboard_rows(
        &self,
        connector: &Connector,
        keywords: &[String],
    ) -> Result<Vec<Row>, DomainError> {
        let dashboards: ListResponse = self.get_json(connector, "/api/v1/dashboard/").await?;
        let Some((dashboard, score)) = best_match(&dashboards.result, keywords, &["dashboard_title", "title"])
        else {
            return Ok(Vec::new());
        };
        let Some(id) = dashboard.get("id").and_then(Value::as_i64) else {
            return Ok(Vec::new());
        };
        debug!("Dashboard {id} matched with score {score}");

        let charts: ListResponse = self
            .get_json(connector, &format!("/api/v1/dashboard/{id}/charts"))
            .await?;
        for chart_id in charts.result.iter().filter_map(|c| c.get("id").and_then(Value::as_i64)) {
            match self.chart_rows(connector, chart_id).await {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => {}
                Err(e) => warn!("Failed to read chart {chart_id}: {e}"),
            }
        }
        Ok(Vec::new())
    }

    async fn chart_rows(&self, connector: &Connector, chart_id: i64) -> Result<Vec<Row>, DomainError> {
        let data: ListResponse = self
            .get_json(connector, &format!("/api/v1/chart/{chart_id}/data"))
            .await?;
        Ok(data
            .result
            .first()
            .and_then(|first| first.get("data"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn dataset_rows(
        &self,
        connector: &Connector,
        keywords: &[String],
    ) -> Result<Vec<Row>, DomainError> {
        let datasets = self.datasets(connector).await?;
        let Some((dataset, _)) = best_match(&datasets, keywords, &["table_name"]) else {
            return Ok(Vec::new());
        };
        let Some(table) = qualified_table(dataset) else {
            return Ok(Vec::new());
        };
        self.select_table(connector, &table, Self::row_limit(connector)).await
    }
}

#[async_trait]
impl SchemaScanner for SupersetClient {
    fn supports(&self, connector_type: ConnectorType) -> bool {
        connector_type == ConnectorType::Superset
    }

    async fn scan(&self, connector: &Connector) -> Result<Vec<TableContext>, DomainError> {
        let datasets = self
            .datasets(connector)
            .await
            .map_err(|e| DomainError::schema_scan(e.to_string()))?;

        let mut tables = Vec::with_capacity(datasets.len());
        for dataset in &datasets {
            let Some(name) = dataset.get("table_name").and_then(Value::as_str) else {
                continue;
            };
            let columns = match dataset.get("id").and_then(Value::as_i64) {
                Some(id) => match self
                    .get_json::<DetailResponse>(connector, &format!("/api/v1/dataset/{id}"))
                    .await
                {
                    Ok(detail) => dataset_columns(&detail.result),
                    Err(e) => {
                        warn!("Could not load columns for dataset {name}: {e}");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };

            let mut table = TableContext::new(name, columns);
            if let Some(schema) = dataset.get("schema").and_then(Value::as_str) {
                table = table.with_schema(schema);
            }
            if let Some(description) = dataset.get("description").and_then(Value::as_str) {
                table = table.with_description(description);
            }
            tables.push(table);
        }

        info!("Scanned {} Superset datasets from {}", tables.len(), connector.id());
        Ok(tables)
    }
}

#[async_trait]
impl SourceClient for SupersetClient {
    fn supports(&self, connector_type: ConnectorType) -> bool {
        connector_type == ConnectorType::Superset
    }

    async fn fetch(
        &self,
        connector: &Connector,
        strategy: &RetrievalStrategy,
    ) -> Result<Vec<Row>, DomainError> {
        match strategy {
            RetrievalStrategy::MatchingDashboard { keywords } => {
                self.dashboard_rows(connector, keywords).await
            }
            RetrievalStrategy::MatchingDataset { keywords } => {
                self.dataset_rows(connector, keywords).await
            }
            RetrievalStrategy::Table { name } => {
                self.select_table(connector, name, Self::row_limit(connector)).await
            }
        }
    }

    async fn fetch_sample(&self, connector: &Connector, limit: usize) -> Result<Vec<Row>, DomainError> {
        let datasets = self.datasets(connector).await?;
        for dataset in &datasets {
            let Some(table) = qualified_table(dataset) else {
                continue;
            };
            match self.select_table(connector, &table, limit).await {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => {}
                Err(e) => debug!("Sample from {table} failed: {e}"),
            }
        }
        Ok(Vec::new())
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accepts `table` or `schema.table` made of plain identifier characters.
pub fn is_safe_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|part| is_identifier(part))
}

fn qualified_table(dataset: &Map<String, Value>) -> Option<String> {
    let table = dataset.get("table_name").and_then(Value::as_str)?;
    Some(match dataset.get("schema").and_then(Value::as_str) {
        Some(schema) if !schema.is_empty() => format!("{schema}.{table}"),
        _ => table.to_string(),
    })
}

fn dataset_columns(detail: &Map<String, Value>) -> Vec<ColumnInfo> {
    detail
        .get("columns")
        .and_then(Value::as_array)
        .map(|columns| {
            columns
                .iter()
                .filter_map(|column| {
                    let name = column.get("column_name").and_then(Value::as_str)?;
                    let data_type = column.get("type").and_then(Value::as_str).unwrap_or_default();
                    Some(ColumnInfo::infer(name, data_type))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Scores a title against query keywords: two points for a contained keyword,
/// one per title word that contains or is contained by a keyword.
pub fn title_score(title: &str, keywords: &[String]) -> usize {
    let title = title.to_lowercase();
    let words: Vec<&str> = title.split_whitespace().collect();
    keywords
        .iter()
        .map(|keyword| {
            let exact = if title.contains(keyword.as_str()) { 2 } else { 0 };
            let partial = words
                .iter()
                .filter(|word| word.contains(keyword.as_str()) || keyword.contains(*word))
                .count();
            exact + partial
        })
        .sum()
}

fn best_match<'a>(
    items: &'a [Map<String, Value>],
    keywords: &[String],
    title_fields: &[&str],
) -> Option<(&'a Map<String, Value>, usize)> {
    let mut best: Option<(&Map<String, Value>, usize)> = None;
    for item in items {
        let Some(title) = title_fields
            .iter()
            .find_map(|field| item.get(*field).and_then(Value::as_str))
        else {
            continue;
        };
        let score = title_score(title, keywords);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((item, score));
        }
    }
    best
}
