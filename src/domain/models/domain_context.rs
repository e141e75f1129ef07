use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConnectorType, IntentType};

/// Business subject area label. Open-ended: new domains come from rule data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(Cow<'static, str>);

impl Domain {
    pub const SALES: Domain = Domain(Cow::Borrowed("sales"));
    pub const MARKETING: Domain = Domain(Cow::Borrowed("marketing"));
    pub const CUSTOMER: Domain = Domain(Cow::Borrowed("customer"));
    pub const PRODUCT: Domain = Domain(Cow::Borrowed("product"));
    pub const FINANCE: Domain = Domain(Cow::Borrowed("finance"));
    pub const OPERATIONS: Domain = Domain(Cow::Borrowed("operations"));
    pub const HR: Domain = Domain(Cow::Borrowed("hr"));
    pub const GAMING: Domain = Domain(Cow::Borrowed("gaming"));
    pub const SLACK: Domain = Domain(Cow::Borrowed("slack"));
    pub const COVID: Domain = Domain(Cow::Borrowed("covid"));
    pub const GENERAL: Domain = Domain(Cow::Borrowed("general"));

    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into().trim().to_lowercase();
        if label.is_empty() {
            return Self::GENERAL;
        }
        Self(Cow::Owned(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_general(&self) -> bool {
        self.as_str() == "general"
    }

    /// Key under which this domain's context is stored in the vector collection.
    pub fn vector_key(&self) -> String {
        format!("domain_{}", self.as_str())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_id: bool,
    pub is_metric: bool,
    pub is_dimension: bool,
    pub is_datetime: bool,
    pub is_currency: bool,
    pub samples: Vec<String>,
}

impl ColumnInfo {
    /// Infers the semantic flags from a column name and its SQL type.
    pub fn infer(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        let data_type = data_type.into();
        let lname = name.to_lowercase();
        let ltype = data_type.to_lowercase();

        let is_id = lname == "id" || lname.ends_with("_id");
        let is_datetime = ["date", "time", "timestamp"]
            .iter()
            .any(|t| ltype.contains(t))
            || lname.ends_with("_at")
            || lname.ends_with("_date");
        let numeric = [
            "int", "decimal", "numeric", "float", "double", "real", "money", "number",
        ]
        .iter()
        .any(|t| ltype.contains(t));
        let is_currency = ["amount", "price", "revenue", "cost", "total", "salary", "budget"]
            .iter()
            .any(|t| lname.contains(t));
        let is_metric = numeric && !is_id;
        let is_dimension = !numeric && !is_id && !is_datetime;

        Self {
            name,
            data_type,
            is_id,
            is_metric,
            is_dimension,
            is_datetime,
            is_currency,
            samples: Vec::new(),
        }
    }
}

/// Table description as discovered by a schema scan, plus its inferred domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContext {
    pub name: String,
    pub schema: String,
    pub description: String,
    pub columns: Vec<ColumnInfo>,
    pub business_tags: Vec<String>,
    pub domain: Domain,
}

impl TableContext {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            schema: "public".to_string(),
            description: String::new(),
            columns,
            business_tags: Vec::new(),
            domain: Domain::GENERAL,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.business_tags = tags;
        self
    }

    pub fn metric_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.is_metric)
    }

    pub fn dimension_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.is_dimension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Sum,
    Count,
    Avg,
    Ratio,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Count => "count",
            AggregationType::Avg => "avg",
            AggregationType::Ratio => "ratio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetric {
    pub name: String,
    pub description: String,
    pub aggregation: AggregationType,
    pub source_table: String,
    pub source_column: String,
    pub dimensions: Vec<String>,
    pub domain: Domain,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    pub synonyms: Vec<String>,
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPattern {
    pub pattern: String,
    pub description: String,
    pub intent: IntentType,
    pub keywords: Vec<String>,
    pub examples: Vec<String>,
}

/// Business-domain summary derived from one connector's schema (or built in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub domain: Domain,
    pub description: String,
    pub keywords: Vec<String>,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub tables: Vec<TableContext>,
    pub glossary: Vec<GlossaryTerm>,
    pub query_patterns: Vec<QueryPattern>,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
    pub auto_generated: bool,
}

impl DomainContext {
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Text embedded for this context: label, description, keywords, tables, glossary, patterns.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = vec![
            self.domain.to_string(),
            self.description.clone(),
            self.keywords.join(" "),
        ];
        for table in &self.tables {
            parts.push(table.name.clone());
            parts.push(table.description.clone());
            parts.push(table.business_tags.join(" "));
        }
        for entry in &self.glossary {
            parts.push(entry.term.clone());
            parts.push(entry.definition.clone());
            parts.push(entry.synonyms.join(" "));
        }
        for pattern in &self.query_patterns {
            parts.push(pattern.description.clone());
            parts.push(pattern.keywords.join(" "));
            parts.push(pattern.examples.join(" "));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRelationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub relation: String,
    pub confidence: f64,
}

/// Full analysis of one connector's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub connector_id: String,
    pub connector_name: String,
    pub connector_type: ConnectorType,
    pub tables: Vec<TableContext>,
    pub business_metrics: Vec<BusinessMetric>,
    pub relationships: Vec<TableRelationship>,
    pub sample_queries: Vec<String>,
    pub primary_domain: Domain,
    pub confidence: f64,
    pub detected_domains: Vec<DomainContext>,
    pub analyzed_at: DateTime<Utc>,
}
