use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A natural-language question as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    timestamp: DateTime<Utc>,
    connector_ids: Vec<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
            connector_ids: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Restrict retrieval to these connectors.
    pub fn with_connector_ids(mut self, ids: Vec<String>) -> Self {
        self.connector_ids = ids;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> String {
        self.text.trim().to_lowercase()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn connector_ids(&self) -> &[String] {
        &self.connector_ids
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_and_lowercases() {
        let query = Query::new("  Show Me SALES  ");
        assert_eq!(query.normalized(), "show me sales");
        assert!(!query.is_blank());
        assert!(Query::new("   ").is_blank());
    }
}
