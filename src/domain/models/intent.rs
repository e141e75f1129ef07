use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of user goal recognised in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Analytics,
    Sql,
    Visualization,
    Comparison,
    Trend,
    Filter,
    Aggregation,
    Join,
    Unknown,
}

impl IntentType {
    pub const ALL: [IntentType; 9] = [
        IntentType::Analytics,
        IntentType::Sql,
        IntentType::Visualization,
        IntentType::Comparison,
        IntentType::Trend,
        IntentType::Filter,
        IntentType::Aggregation,
        IntentType::Join,
        IntentType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Analytics => "analytics",
            IntentType::Sql => "sql",
            IntentType::Visualization => "visualization",
            IntentType::Comparison => "comparison",
            IntentType::Trend => "trend",
            IntentType::Filter => "filter",
            IntentType::Aggregation => "aggregation",
            IntentType::Join => "join",
            IntentType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == needle)
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entities found in a query, keyed by category. Only non-empty categories are present.
pub type Entities = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: String,
    pub field: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortCriteria {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub left: String,
    pub right: String,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Raw period phrase, e.g. `last quarter` or `2024-01-31`.
    pub period: String,
    pub relative: bool,
}

/// Structured reading of a query: what to do, on which metrics, sliced how.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub main_action: String,
    pub output_format: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Vec<Filter>,
    pub aggregations: Vec<Aggregation>,
    pub sort: Vec<SortCriteria>,
    pub group_by: Vec<String>,
    pub joins: Vec<Join>,
    pub data_sources: Vec<String>,
    pub time_range: Option<TimeRange>,
    pub limit: Option<usize>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    intent_type: IntentType,
    confidence: f64,
    entities: Entities,
    parameters: BTreeMap<String, String>,
    parsed_query: ParsedQuery,
}

impl Intent {
    /// Confidence is clamped to `[0, 1]`.
    pub fn new(intent_type: IntentType, confidence: f64) -> Self {
        Self {
            intent_type,
            confidence: clamp_confidence(confidence),
            entities: Entities::new(),
            parameters: BTreeMap::new(),
            parsed_query: ParsedQuery::default(),
        }
    }

    pub fn with_entities(mut self, entities: Entities) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parsed_query(mut self, parsed_query: ParsedQuery) -> Self {
        self.parsed_query = parsed_query;
        self
    }

    pub fn intent_type(&self) -> IntentType {
        self.intent_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parsed_query(&self) -> &ParsedQuery {
        &self.parsed_query
    }

    pub fn is_unknown(&self) -> bool {
        self.intent_type == IntentType::Unknown
    }
}

/// Clamps a heuristic score into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
