use std::time::Duration;

use uuid::Uuid;

use crate::domain::{
    IntentType, ParsedQuery, Query, TaskGraph, TaskStatus, TaskStep, TaskStepType,
};

/// Static description of one step in an intent's plan.
#[derive(Debug, Clone, Copy)]
pub struct StepTemplate {
    pub id: &'static str,
    pub step_type: TaskStepType,
    pub description: &'static str,
    pub action: &'static str,
    pub depends_on: &'static [&'static str],
    pub estimated_secs: u64,
}

const ANALYTICS: &[StepTemplate] = &[
    StepTemplate {
        id: "data_discovery",
        step_type: TaskStepType::DataRetrieval,
        description: "Discover relevant data sources",
        action: "discover_sources",
        depends_on: &[],
        estimated_secs: 2,
    },
    StepTemplate {
        id: "data_retrieval",
        step_type: TaskStepType::DataRetrieval,
        description: "Retrieve data from sources",
        action: "fetch_data",
        depends_on: &["data_discovery"],
        estimated_secs: 5,
    },
    StepTemplate {
        id: "data_analysis",
        step_type: TaskStepType::Analysis,
        description: "Analyze retrieved data",
        action: "analyze_data",
        depends_on: &["data_retrieval"],
        estimated_secs: 8,
    },
];

const SQL: &[StepTemplate] = &[
    StepTemplate {
        id: "sql_validation",
        step_type: TaskStepType::Validation,
        description: "Validate SQL query",
        action: "validate_sql",
        depends_on: &[],
        estimated_secs: 1,
    },
    StepTemplate {
        id: "sql_execution",
        step_type: TaskStepType::DataRetrieval,
        description: "Execute SQL query",
        action: "execute_sql",
        depends_on: &["sql_validation"],
        estimated_secs: 10,
    },
];

const VISUALIZATION: &[StepTemplate] = &[
    StepTemplate {
        id: "data_preparation",
        step_type: TaskStepType::Transformation,
        description: "Prepare data for visualization",
        action: "prepare_viz_data",
        depends_on: &[],
        estimated_secs: 3,
    },
    StepTemplate {
        id: "chart_generation",
        step_type: TaskStepType::Visualization,
        description: "Generate visualization",
        action: "create_visualization",
        depends_on: &["data_preparation"],
        estimated_secs: 5,
    },
];

const COMPARISON: &[StepTemplate] = &[
    StepTemplate {
        id: "multi_source_retrieval",
        step_type: TaskStepType::DataRetrieval,
        description: "Retrieve data from multiple sources for comparison",
        action: "fetch_comparison_data",
        depends_on: &[],
        estimated_secs: 7,
    },
    StepTemplate {
        id: "data_alignment",
        step_type: TaskStepType::Transformation,
        description: "Align data for comparison",
        action: "align_data",
        depends_on: &["multi_source_retrieval"],
        estimated_secs: 4,
    },
    StepTemplate {
        id: "comparison_analysis",
        step_type: TaskStepType::Analysis,
        description: "Perform comparison analysis",
        action: "compare_data",
        depends_on: &["data_alignment"],
        estimated_secs: 6,
    },
];

const TREND: &[StepTemplate] = &[
    StepTemplate {
        id: "time_series_data",
        step_type: TaskStepType::DataRetrieval,
        description: "Retrieve time series data",
        action: "fetch_time_series",
        depends_on: &[],
        estimated_secs: 5,
    },
    StepTemplate {
        id: "trend_analysis",
        step_type: TaskStepType::Analysis,
        description: "Analyze trends and patterns",
        action: "analyze_trends",
        depends_on: &["time_series_data"],
        estimated_secs: 8,
    },
];

const GENERAL: &[StepTemplate] = &[StepTemplate {
    id: "general_processing",
    step_type: TaskStepType::Analysis,
    description: "Process general query",
    action: "process_query",
    depends_on: &[],
    estimated_secs: 5,
}];

/// Step template for an intent label.
pub fn template_for(intent: IntentType) -> &'static [StepTemplate] {
    match intent {
        IntentType::Analytics => ANALYTICS,
        IntentType::Sql => SQL,
        IntentType::Visualization => VISUALIZATION,
        IntentType::Comparison => COMPARISON,
        IntentType::Trend => TREND,
        IntentType::Filter | IntentType::Aggregation | IntentType::Join | IntentType::Unknown => {
            GENERAL
        }
    }
}

/// Expands an intent into its task graph. Same inputs always give the same graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskGraphBuilder;

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, intent: IntentType, parsed: &ParsedQuery, query: &Query) -> TaskGraph {
        let steps: Vec<TaskStep> = template_for(intent)
            .iter()
            .enumerate()
            .map(|(i, t)| TaskStep {
                id: t.id.to_string(),
                step_type: t.step_type,
                description: t.description.to_string(),
                action: t.action.to_string(),
                dependencies: t.depends_on.iter().map(|d| d.to_string()).collect(),
                priority: i as u32 + 1,
                estimated_duration: Duration::from_secs(t.estimated_secs),
                data_sources: if t.step_type == TaskStepType::DataRetrieval {
                    parsed.data_sources.clone()
                } else {
                    Vec::new()
                },
                status: TaskStatus::Planned,
            })
            .collect();

        let graph = TaskGraph::new(
            graph_id(intent, query.text()),
            query.text(),
            intent,
            steps,
            query.timestamp(),
        );
        debug_assert!(graph.validate().is_ok(), "task template for {intent} is not a DAG");
        graph
    }
}

fn graph_id(intent: IntentType, text: &str) -> String {
    let name = format!("{}:{}", intent.as_str(), text);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
