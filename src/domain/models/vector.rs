use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored entry of a vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    id: String,
    vector: Vec<f32>,
    metadata: Map<String, Value>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// A search hit: record id, similarity score and the record's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    id: String,
    score: f32,
    metadata: Map<String, Value>,
}

impl VectorMatch {
    pub fn new(id: impl Into<String>, score: f32, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Reads a metadata field stored as an array of strings.
    pub fn metadata_list(&self, key: &str) -> Vec<String> {
        self.metadata
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_accessors_tolerate_missing_and_mistyped_fields() {
        let mut metadata = Map::new();
        metadata.insert("domain".into(), json!("sales"));
        metadata.insert("keywords".into(), json!(["order", 3, "invoice"]));
        metadata.insert("table_count".into(), json!(2));
        let hit = VectorMatch::new("domain_sales", 0.9, metadata);

        assert_eq!(hit.metadata_str("domain"), Some("sales"));
        assert_eq!(hit.metadata_str("table_count"), None);
        assert_eq!(hit.metadata_list("keywords"), vec!["order", "invoice"]);
        assert!(hit.metadata_list("tables").is_empty());
    }
}
