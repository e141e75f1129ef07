use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Domain;

/// One record returned by a data source.
pub type Row = Map<String, Value>;

/// A query-specific way of pulling rows out of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Dashboard whose title matches the query keywords; rows come from its first chart.
    MatchingDashboard { keywords: Vec<String> },
    /// Dataset or table whose name matches the query keywords.
    MatchingDataset { keywords: Vec<String> },
    /// A table named by the domain context.
    Table { name: String },
}

impl RetrievalStrategy {
    pub fn label(&self) -> String {
        match self {
            RetrievalStrategy::MatchingDashboard { .. } => "matching_dashboard".to_string(),
            RetrievalStrategy::MatchingDataset { .. } => "matching_dataset".to_string(),
            RetrievalStrategy::Table { name } => format!("table:{name}"),
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Domain and tables taken from a confident classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHint {
    pub domain: Domain,
    pub tables: Vec<String>,
    pub keywords: Vec<String>,
}

/// Rows contributed by one connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub connector_id: String,
    pub connector_name: String,
    /// Strategy label, or `sample` when the representative sample produced the rows.
    pub strategy: String,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub rows: Vec<Row>,
    pub sources: Vec<SourceResult>,
    pub attempted: Vec<String>,
    pub domain_aware: bool,
}

impl RetrievalOutcome {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_labels() {
        assert_eq!(
            RetrievalStrategy::MatchingDashboard { keywords: vec![] }.label(),
            "matching_dashboard"
        );
        assert_eq!(
            RetrievalStrategy::Table {
                name: "orders".into()
            }
            .to_string(),
            "table:orders"
        );
    }
}
