use serde::{Deserialize, Serialize};

use super::{Domain, IntentType};

/// Which path produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Nearest domain context in the vector collection.
    Vector,
    /// Pattern and generative path, used when vector lookup failed or found nothing.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub domain: Domain,
    pub intent: IntentType,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub reasoning: String,
    /// Descriptions of the closest domain contexts, best first.
    pub context: Vec<String>,
    /// Table names of the best match, used as a retrieval hint.
    pub tables: Vec<String>,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    /// Minimum confidence for domain-aware retrieval.
    pub const ROUTING_THRESHOLD: f64 = 0.6;

    pub fn routes_to_domain(&self) -> bool {
        self.confidence >= Self::ROUTING_THRESHOLD && !self.domain.is_general()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(domain: Domain, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            domain,
            intent: IntentType::Analytics,
            confidence,
            keywords: Vec::new(),
            reasoning: String::new(),
            context: Vec::new(),
            tables: Vec::new(),
            source: ClassificationSource::Vector,
        }
    }

    #[test]
    fn routing_requires_confident_specific_domain() {
        assert!(result(Domain::SALES, 0.6).routes_to_domain());
        assert!(!result(Domain::SALES, 0.59).routes_to_domain());
        assert!(!result(Domain::GENERAL, 0.95).routes_to_domain());
    }
}
