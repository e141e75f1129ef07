use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classify_intent::ClassifyIntentUseCase;
use super::deadline::bounded;
use crate::application::{EmbeddingService, VectorRepository};
use crate::domain::{
    clamp_confidence, ClassificationResult, ClassificationSource, Domain, DomainError, Intent,
    VectorMatch,
};

/// Collection holding one record per business domain.
pub const DOMAIN_COLLECTION: &str = "domain_contexts";

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TOP_K: usize = 3;
const CONTEXT_MATCHES: usize = 2;

/// Retrieval-augmented domain classification over the ingested domain contexts.
pub struct ClassifyDomainUseCase {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_repo: Arc<dyn VectorRepository>,
    intents: Arc<ClassifyIntentUseCase>,
    collection: String,
    top_k: usize,
    timeout: Duration,
}

impl ClassifyDomainUseCase {
    pub fn new(
        embedding_service: Arc<dyn EmbeddingService>,
        vector_repo: Arc<dyn VectorRepository>,
        intents: Arc<ClassifyIntentUseCase>,
    ) -> Self {
        Self {
            embedding_service,
            vector_repo,
            intents,
            collection: DOMAIN_COLLECTION.to_string(),
            top_k: DEFAULT_TOP_K,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::invalid_input("query text is empty"));
        }

        let intent = self.intents.execute(query, cancel).await?;
        let lookup = bounded(cancel, self.timeout, "domain lookup", self.nearest_domains(query)).await;

        let result = match lookup {
            Ok(matches) if !matches.is_empty() => self.from_matches(query, &intent, &matches),
            Ok(_) => fallback(&intent, "no domain contexts are indexed"),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Domain lookup failed, using intent classification only: {e}");
                fallback(&intent, &e.to_string())
            }
        };

        info!(
            "Classified query as domain={} intent={} confidence={:.2} via {:?}",
            result.domain, result.intent, result.confidence, result.source
        );
        Ok(result)
    }

    async fn nearest_domains(&self, query: &str) -> Result<Vec<VectorMatch>, DomainError> {
        let embedding = self.embedding_service.embed(query).await?;
        let matches = self
            .vector_repo
            .search(&self.collection, embedding.vector(), self.top_k)
            .await?;
        debug!("Domain lookup returned {} matches", matches.len());
        Ok(matches)
    }

    fn from_matches(&self, query: &str, intent: &Intent, matches: &[VectorMatch]) -> ClassificationResult {
        let best = &matches[0];
        let domain = Domain::new(best.metadata_str("domain").unwrap_or_default());
        let confidence = clamp_confidence(f64::from(best.score()));

        let lowered = query.to_lowercase();
        let keywords: Vec<String> = best
            .metadata_list("keywords")
            .into_iter()
            .filter(|k| !k.is_empty() && lowered.contains(k.as_str()))
            .collect();

        let context: Vec<String> = matches
            .iter()
            .take(CONTEXT_MATCHES)
            .filter_map(|m| m.metadata_str("description"))
            .map(str::to_string)
            .collect();

        ClassificationResult {
            reasoning: format!(
                "Closest domain context is {} (similarity {:.2}); intent {} from {} classifier",
                domain,
                confidence,
                intent.intent_type(),
                classifier_of(intent)
            ),
            domain,
            intent: intent.intent_type(),
            confidence,
            keywords,
            context,
            tables: best.metadata_list("tables"),
            source: ClassificationSource::Vector,
        }
    }
}

fn classifier_of(intent: &Intent) -> &str {
    intent
        .parameters()
        .get("classifier")
        .map(String::as_str)
        .unwrap_or("pattern")
}

fn fallback(intent: &Intent, reason: &str) -> ClassificationResult {
    ClassificationResult {
        domain: Domain::GENERAL,
        intent: intent.intent_type(),
        confidence: intent.confidence(),
        keywords: Vec::new(),
        reasoning: format!(
            "Domain lookup unavailable ({reason}); using {} intent classification",
            classifier_of(intent)
        ),
        context: Vec::new(),
        tables: Vec::new(),
        source: ClassificationSource::Fallback,
    }
}
