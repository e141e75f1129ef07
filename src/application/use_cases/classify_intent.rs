use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::deadline::bounded;
use crate::application::TextGenerator;
use crate::domain::{clamp_confidence, DomainError, Intent, IntentType, PatternClassifier};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Pattern results at or above this confidence skip the generative model.
const CONFIDENT_PATTERN: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct GenerativeAnswer {
    #[serde(rename = "type")]
    intent: String,
    confidence: f64,
}

/// Pattern classification with an optional generative second opinion.
pub struct ClassifyIntentUseCase {
    patterns: PatternClassifier,
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl ClassifyIntentUseCase {
    pub fn new() -> Self {
        Self {
            patterns: PatternClassifier::new(),
            generator: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(&self, query: &str, cancel: &CancellationToken) -> Result<Intent, DomainError> {
        let pattern = self.patterns.classify(query);
        if pattern.confidence() >= CONFIDENT_PATTERN && !pattern.is_unknown() {
            return Ok(pattern);
        }
        let Some(generator) = &self.generator else {
            return Ok(pattern);
        };

        let prompt = classification_prompt(query);
        let answer = bounded(cancel, self.timeout, "generative classification", generator.generate(&prompt))
            .await
            .and_then(|text| parse_answer(&text));

        match answer {
            Ok((intent_type, confidence)) if confidence > pattern.confidence() => {
                debug!(
                    "Generative model {} classified query as {} ({:.2}), pattern gave {} ({:.2})",
                    generator.model_name(),
                    intent_type,
                    confidence,
                    pattern.intent_type(),
                    pattern.confidence()
                );
                Ok(Intent::new(intent_type, confidence)
                    .with_parameter("classifier", "generative")
                    .with_parameter("model", generator.model_name()))
            }
            Ok(_) => Ok(pattern),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) if e.is_timeout() => {
                warn!("Generative classification fell back to patterns: {e}");
                Ok(pattern)
            }
            Err(e) => {
                debug!("Generative classification fell back to patterns: {e}");
                Ok(pattern)
            }
        }
    }
}

impl Default for ClassifyIntentUseCase {
    fn default() -> Self {
        Self::new()
    }
}

fn classification_prompt(query: &str) -> String {
    let labels: Vec<&str> = IntentType::ALL.iter().map(|t| t.as_str()).collect();
    format!(
        "Classify the following analytics query into exactly one intent type.\n\
         Intent types: {}\n\n\
         Query: \"{}\"\n\n\
         Respond with JSON only: {{\"type\": \"<intent type>\", \"confidence\": <number between 0 and 1>}}",
        labels.join(", "),
        query.trim()
    )
}

/// Reads `{"type": .., "confidence": ..}` out of free text.
fn parse_answer(text: &str) -> Result<(IntentType, f64), DomainError> {
    let object = first_json_object(text)
        .ok_or_else(|| DomainError::parse("no JSON object in generative answer"))?;
    let answer: GenerativeAnswer = serde_json::from_str(object)
        .map_err(|e| DomainError::parse(format!("malformed generative answer: {e}")))?;

    let intent_type = IntentType::parse(&answer.intent)
        .ok_or_else(|| DomainError::parse(format!("unknown intent label '{}'", answer.intent)))?;
    if !answer.confidence.is_finite() {
        return Err(DomainError::parse("non-finite confidence in generative answer"));
    }
    Ok((intent_type, clamp_confidence(answer.confidence)))
}

/// First balanced top-level `{...}` region, skipping braces inside JSON strings.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
