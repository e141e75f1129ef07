use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionFailure {
    pub connector_id: String,
    pub connector_name: String,
    pub error: String,
}

/// What an ingestion run wrote, skipped, and failed on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Vector keys written, e.g. `domain_sales`.
    pub ingested: Vec<String>,
    /// Connectors left out because they were not connected.
    pub skipped: Vec<String>,
    pub failures: Vec<IngestionFailure>,
}

impl IngestionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: IngestionReport) {
        self.ingested.extend(other.ingested);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} contexts ingested, {} connectors skipped, {} failures",
            self.ingested.len(),
            self.skipped.len(),
            self.failures.len()
        )
    }
}
