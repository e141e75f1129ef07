use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row as _;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config_schema_scanner::ConfigSchemaScanner;
use super::superset_client::{is_safe_table_name, title_score};
use crate::application::{SchemaScanner, SourceClient};
use crate::domain::{ColumnInfo, Connector, ConnectorType, DomainError, RetrievalStrategy, Row, TableContext};

pub const DEFAULT_PG_SCHEMA: &str = "public";
pub const MAX_QUERY_LENGTH: usize = 10_000;
const DEFAULT_ROW_LIMIT: usize = 100;
const POOL_SIZE: u32 = 4;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const FORBIDDEN_WORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "EXEC",
    "EXECUTE", "GRANT", "REVOKE", "MERGE", "CALL", "COPY", "PG_SLEEP", "INTO",
];
const FORBIDDEN_FRAGMENTS: &[&str] = &["--", "/*", "*/", "\\COPY"];

/// Direct PostgreSQL source: `information_schema` scanning for context
/// generation and read-only table selects for retrieval.
///
/// Connector config keys: `url` (a `postgres://` connection string),
/// optional `schema` (default `public`) and `row_limit`. A connector with no
/// `url` is described by its declared `tables` instead of a live scan.
pub struct PostgresClient {
    pools: RwLock<HashMap<String, PgPool>>,
}

impl Default for PostgresClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresClient {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    fn url(connector: &Connector) -> Result<&str, DomainError> {
        connector.config_str("url").ok_or_else(|| {
            DomainError::invalid_input(format!("Postgres connector {} has no url", connector.id()))
        })
    }

    fn schema(connector: &Connector) -> &str {
        connector.config_str("schema").unwrap_or(DEFAULT_PG_SCHEMA)
    }

    fn row_limit(connector: &Connector) -> usize {
        connector
            .config()
            .get("row_limit")
            .and_then(Value::as_u64)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_ROW_LIMIT)
    }

    async fn pool(&self, connector: &Connector) -> Result<PgPool, DomainError> {
        if let Some(pool) = self.pools.read().await.get(connector.id()) {
            return Ok(pool.clone());
        }

        let pool = PgPoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(Self::url(connector)?)
            .await
            .map_err(|e| DomainError::source(format!("Cannot connect to {}: {e}", connector.id())))?;

        info!("Connected to Postgres connector {}", connector.id());
        self.pools
            .write()
            .await
            .insert(connector.id().to_string(), pool.clone());
        Ok(pool)
    }

    /// Runs a validated read-only select and returns each record as a JSON object.
    pub async fn execute_query(&self, connector: &Connector, sql: &str) -> Result<Vec<Row>, DomainError> {
        validate_select(sql)?;
        let pool = self.pool(connector).await?;
        let wrapped = format!(
            "SELECT row_to_json(q) AS record FROM ({}) q",
            sql.trim().trim_end_matches(';')
        );
        debug!("Postgres query on {}: {sql}", connector.id());

        let records = sqlx::query(&wrapped)
            .fetch_all(&pool)
            .await
            .map_err(|e| DomainError::source(format!("Query on {} failed: {e}", connector.id())))?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let value: Value = record
                .try_get("record")
                .map_err(|e| DomainError::parse(format!("Unreadable row from {}: {e}", connector.id())))?;
            if let Value::Object(row) = value {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn select_table(&self, connector: &Connector, table: &str, limit: usize) -> Result<Vec<Row>, DomainError> {
        if !is_safe_table_name(table) {
            return Err(DomainError::invalid_input(format!("Refusing to query table '{table}'")));
        }
        let table = qualify(table, Self::schema(connector));
        self.execute_query(connector, &format!("SELECT * FROM {table} LIMIT {limit}"))
            .await
    }

    async fn table_names(&self, connector: &Connector) -> Result<Vec<String>, DomainError> {
        let pool = self.pool(connector).await?;
        let records = sqlx::query(
            "SELECT table_name::text AS table_name FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name",
        )
        .bind(Self::schema(connector))
        .fetch_all(&pool)
        .await
        .map_err(|e| DomainError::source(format!("Listing tables of {} failed: {e}", connector.id())))?;

        records
            .iter()
            .map(|record| {
                record
                    .try_get::<String, _>("table_name")
                    .map_err(|e| DomainError::parse(e.to_string()))
            })
            .collect()
    }

    async fn matching_table_rows(&self, connector: &Connector, keywords: &[String]) -> Result<Vec<Row>, DomainError> {
        let tables = self.table_names(connector).await?;
        let Some(table) = best_table(&tables, keywords) else {
            return Ok(Vec::new());
        };
        debug!("Table {table} best matches {keywords:?}");
        self.select_table(connector, table, Self::row_limit(connector)).await
    }

    async fn scan_live(&self, connector: &Connector) -> Result<Vec<TableContext>, DomainError> {
        let pool = self.pool(connector).await?;
        let schema = Self::schema(connector);
        let records = sqlx::query(
            "SELECT table_name::text AS table_name, column_name::text AS column_name, \
             data_type::text AS data_type FROM information_schema.columns \
             WHERE table_schema = $1 ORDER BY table_name, ordinal_position",
        )
        .bind(schema)
        .fetch_all(&pool)
        .await
        .map_err(|e| DomainError::schema_scan(format!("Scanning {} failed: {e}", connector.id())))?;

        let mut columns: BTreeMap<String, Vec<ColumnInfo>> = BTreeMap::new();
        for record in &records {
            let read = |field: &str| {
                record
                    .try_get::<String, _>(field)
                    .map_err(|e| DomainError::schema_scan(e.to_string()))
            };
            let (table, column, data_type) = (read("table_name")?, read("column_name")?, read("data_type")?);
            columns
                .entry(table)
                .or_default()
                .push(ColumnInfo::infer(column, data_type));
        }

        info!("Scanned {} tables from {}.{schema}", columns.len(), connector.id());
        Ok(columns
            .into_iter()
            .map(|(name, columns)| TableContext::new(name, columns).with_schema(schema))
            .collect())
    }
}

#[async_trait]
impl SchemaScanner for PostgresClient {
    fn supports(&self, connector_type: ConnectorType) -> bool {
        connector_type == ConnectorType::Postgres
    }

    async fn scan(&self, connector: &Connector) -> Result<Vec<TableContext>, DomainError> {
        if connector.config_str("url").is_none() {
            return ConfigSchemaScanner::new().scan(connector).await;
        }
        self.scan_live(connector).await
    }
}

#[async_trait]
impl SourceClient for PostgresClient {
    fn supports(&self, connector_type: ConnectorType) -> bool {
        connector_type == ConnectorType::Postgres
    }

    async fn fetch(&self, connector: &Connector, strategy: &RetrievalStrategy) -> Result<Vec<Row>, DomainError> {
        match strategy {
            RetrievalStrategy::MatchingDashboard { .. } => Ok(Vec::new()),
            RetrievalStrategy::MatchingDataset { keywords } => self.matching_table_rows(connector, keywords).await,
            RetrievalStrategy::Table { name } => {
                self.select_table(connector, name, Self::row_limit(connector)).await
            }
        }
    }

    async fn fetch_sample(&self, connector: &Connector, limit: usize) -> Result<Vec<Row>, DomainError> {
        for table in self.table_names(connector).await? {
            match self.select_table(connector, &table, limit).await {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => {}
                Err(e) => warn!("Sample from {table} failed: {e}"),
            }
        }
        Ok(Vec::new())
    }
}

/// Accepts a single read-only `SELECT` statement.
pub fn validate_select(sql: &str) -> Result<(), DomainError> {
    if sql.len() > MAX_QUERY_LENGTH {
        return Err(DomainError::invalid_input("query exceeds the maximum length"));
    }
    let statement = sql.trim();
    let statement = statement.strip_suffix(';').unwrap_or(statement);
    let upper = statement.to_uppercase();

    if !upper.starts_with("SELECT") {
        return Err(DomainError::invalid_input("only SELECT statements are allowed"));
    }
    if statement.contains(';') {
        return Err(DomainError::invalid_input("multiple statements are not allowed"));
    }
    if let Some(fragment) = FORBIDDEN_FRAGMENTS.iter().find(|f| upper.contains(**f)) {
        return Err(DomainError::invalid_input(format!("query contains '{fragment}'")));
    }
    let forbidden = upper
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|word| FORBIDDEN_WORDS.contains(word));
    if let Some(word) = forbidden {
        return Err(DomainError::invalid_input(format!("query uses {word}")));
    }
    Ok(())
}

fn qualify(table: &str, schema: &str) -> String {
    if table.contains('.') {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

fn best_table<'a>(tables: &'a [String], keywords: &[String]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for table in tables {
        let score = title_score(&table.replace('_', " "), keywords);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((table.as_str(), score));
        }
    }
    best.map(|(table, _)| table)
}
