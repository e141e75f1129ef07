use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Intent, TaskGraph};

/// Result of planning one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub intent: Intent,
    pub task_graph: TaskGraph,
    pub confidence: f64,
    pub process_time: Duration,
    pub created_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}
