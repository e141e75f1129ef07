use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use super::IntentType;
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStepType {
    DataRetrieval,
    Validation,
    Transformation,
    Analysis,
    Visualization,
}

impl TaskStepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStepType::DataRetrieval => "data_retrieval",
            TaskStepType::Validation => "validation",
            TaskStepType::Transformation => "transformation",
            TaskStepType::Analysis => "analysis",
            TaskStepType::Visualization => "visualization",
        }
    }
}

impl fmt::Display for TaskStepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Planned,
    Running,
    Completed,
    /// Handed to a downstream layer (analysis, rendering) outside this crate.
    Deferred,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Planned => "planned",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    pub id: String,
    pub step_type: TaskStepType,
    pub description: String,
    pub action: String,
    pub dependencies: Vec<String>,
    pub priority: u32,
    pub estimated_duration: Duration,
    pub data_sources: Vec<String>,
    pub status: TaskStatus,
}

/// Ordered, dependency-annotated execution plan for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    id: String,
    query: String,
    intent: IntentType,
    steps: Vec<TaskStep>,
    dependencies: BTreeMap<String, Vec<String>>,
    estimated_total: Duration,
    status: TaskStatus,
    created_at: DateTime<Utc>,
}

impl TaskGraph {
    /// Derives the dependency map and total duration from `steps`.
    pub fn new(
        id: impl Into<String>,
        query: impl Into<String>,
        intent: IntentType,
        steps: Vec<TaskStep>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let dependencies = steps
            .iter()
            .filter(|s| !s.dependencies.is_empty())
            .map(|s| (s.id.clone(), s.dependencies.clone()))
            .collect();
        let estimated_total = steps.iter().map(|s| s.estimated_duration).sum();

        Self {
            id: id.into(),
            query: query.into(),
            intent,
            steps,
            dependencies,
            estimated_total,
            status: TaskStatus::Planned,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn intent(&self) -> IntentType {
        self.intent
    }

    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&TaskStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn dependencies(&self) -> &BTreeMap<String, Vec<String>> {
        &self.dependencies
    }

    pub fn estimated_total(&self) -> Duration {
        self.estimated_total
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub fn set_step_status(&mut self, step_id: &str, status: TaskStatus) -> Result<(), DomainError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| DomainError::not_found(format!("task step {step_id}")))?;
        step.status = status;
        Ok(())
    }

    pub fn has_step_type(&self, step_type: TaskStepType) -> bool {
        self.steps.iter().any(|s| s.step_type == step_type)
    }

    /// Checks unique ids, in-graph dependency references and acyclicity.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.execution_order().map(|_| ())
    }

    /// Step ids in an order where every dependency precedes its dependents.
    pub fn execution_order(&self) -> Result<Vec<String>, DomainError> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        let mut seen = HashSet::new();

        let mut by_priority: Vec<&TaskStep> = self.steps.iter().collect();
        by_priority.sort_by_key(|s| s.priority);

        for step in &by_priority {
            if !seen.insert(step.id.as_str()) {
                return Err(DomainError::internal(format!(
                    "duplicate task step id '{}'",
                    step.id
                )));
            }
            nodes.insert(step.id.as_str(), graph.add_node(step.id.as_str()));
        }

        for step in &by_priority {
            let to = nodes[step.id.as_str()];
            for dep in &step.dependencies {
                let from = nodes.get(dep.as_str()).ok_or_else(|| {
                    DomainError::internal(format!(
                        "task step '{}' depends on unknown step '{}'",
                        step.id, dep
                    ))
                })?;
                graph.add_edge(*from, to, ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            DomainError::internal(format!(
                "task graph has a cycle through '{}'",
                graph[cycle.node_id()]
            ))
        })?;

        Ok(order.into_iter().map(|idx| graph[idx].to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, deps: &[&str], priority: u32, secs: u64) -> TaskStep {
        TaskStep {
            id: id.to_string(),
            step_type: TaskStepType::Analysis,
            description: String::new(),
            action: id.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            priority,
            estimated_duration: Duration::from_secs(secs),
            data_sources: Vec::new(),
            status: TaskStatus::Planned,
        }
    }

    #[test]
    fn new_derives_dependencies_and_total() {
        let graph = TaskGraph::new(
            "g",
            "q",
            IntentType::Trend,
            vec![step("a", &[], 1, 5), step("b", &["a"], 2, 8)],
            Utc::now(),
        );

        assert_eq!(graph.estimated_total(), Duration::from_secs(13));
        assert_eq!(graph.dependencies().len(), 1);
        assert_eq!(graph.dependencies()["b"], vec!["a".to_string()]);
        assert_eq!(graph.status(), TaskStatus::Planned);
    }

    #[test]
    fn execution_order_respects_dependencies() {
        let graph = TaskGraph::new(
            "g",
            "q",
            IntentType::Analytics,
            vec![
                step("c", &["b"], 3, 1),
                step("a", &[], 1, 1),
                step("b", &["a"], 2, 1),
            ],
            Utc::now(),
        );

        assert_eq!(graph.execution_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn validate_rejects_cycles_and_dangling_edges() {
        let cyclic = TaskGraph::new(
            "g",
            "q",
            IntentType::Analytics,
            vec![step("a", &["b"], 1, 1), step("b", &["a"], 2, 1)],
            Utc::now(),
        );
        assert!(cyclic.validate().is_err());

        let dangling = TaskGraph::new(
            "g",
            "q",
            IntentType::Analytics,
            vec![step("a", &["missing"], 1, 1)],
            Utc::now(),
        );
        assert!(dangling.validate().is_err());

        let duplicate = TaskGraph::new(
            "g",
            "q",
            IntentType::Analytics,
            vec![step("a", &[], 1, 1), step("a", &[], 2, 1)],
            Utc::now(),
        );
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn set_step_status_reports_unknown_step() {
        let mut graph = TaskGraph::new(
            "g",
            "q",
            IntentType::Sql,
            vec![step("a", &[], 1, 1)],
            Utc::now(),
        );
        graph.set_step_status("a", TaskStatus::Completed).unwrap();
        assert_eq!(graph.step("a").unwrap().status, TaskStatus::Completed);
        assert!(graph.set_step_status("z", TaskStatus::Failed).unwrap_err().is_not_found());
    }
}
