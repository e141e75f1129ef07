use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    Superset,
    Postgres,
    Mysql,
    Mongodb,
    Api,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::Superset => "superset",
            ConnectorType::Postgres => "postgres",
            ConnectorType::Mysql => "mysql",
            ConnectorType::Mongodb => "mongodb",
            ConnectorType::Api => "api",
        }
    }

    pub fn supports_dashboards(&self) -> bool {
        matches!(self, ConnectorType::Superset)
    }

    pub fn supports_direct_query(&self) -> bool {
        matches!(self, ConnectorType::Postgres | ConnectorType::Mysql)
    }

    /// Query words that make this kind of source a relevant candidate.
    pub fn relevance_keywords(&self) -> &'static [&'static str] {
        match self {
            ConnectorType::Superset => &[
                "dashboard",
                "chart",
                "trend",
                "analytics",
                "visualization",
                "report",
                "performance",
            ],
            ConnectorType::Postgres | ConnectorType::Mysql => &[
                "sales", "customer", "order", "revenue", "data", "record", "product", "table",
            ],
            ConnectorType::Mongodb => &["document", "collection", "event", "log"],
            ConnectorType::Api => &["api", "endpoint", "service", "external"],
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Testing,
    Error,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorStatus::Connected => "connected",
            ConnectorStatus::Disconnected => "disconnected",
            ConnectorStatus::Testing => "testing",
            ConnectorStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configured external data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    id: String,
    name: String,
    #[serde(rename = "type")]
    connector_type: ConnectorType,
    status: ConnectorStatus,
    #[serde(default)]
    config: Map<String, Value>,
}

impl Connector {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        connector_type: ConnectorType,
        status: ConnectorStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connector_type,
            status,
            config: Map::new(),
        }
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector_type(&self) -> ConnectorType {
        self.connector_type
    }

    pub fn status(&self) -> ConnectorStatus {
        self.status
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectorStatus::Connected
    }
}
