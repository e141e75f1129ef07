use regex::Regex;
use tracing::warn;

use super::entity_extractor::{AGGREGATIONS, DATES, METRICS, RELATIVE_DAYS, TIME_WINDOWS};
use crate::domain::{
    Aggregation, Entities, Filter, IntentType, ParsedQuery, SortCriteria, SortDirection, TimeRange,
};

const GROUP_BY_PATTERN: &str = r"(?i)\b(?:by|per|each)\s+([a-z][a-z_]*)";
const COMPARISON_FILTER_PATTERN: &str =
    r"(?i)\b([a-z_]+)\s+(greater than|more than|above|over|less than|below|under|equal to)\s+(\d+(?:\.\d+)?)";
const RANKING_PATTERN: &str = r"(?i)\b(top|bottom)\s+(\d+)\b";

/// Words that follow "by"/"per" without naming a dimension.
const NON_DIMENSIONS: &[&str] = &["the", "a", "an", "all", "each", "every", "which", "what"];

/// Derives the structured reading of a query from its text, intent label and entities.
pub struct QueryStructureParser {
    group_by: Option<Regex>,
    comparison_filter: Option<Regex>,
    ranking: Option<Regex>,
}

impl QueryStructureParser {
    pub fn new() -> Self {
        Self {
            group_by: compile(GROUP_BY_PATTERN),
            comparison_filter: compile(COMPARISON_FILTER_PATTERN),
            ranking: compile(RANKING_PATTERN),
        }
    }

    pub fn parse(&self, query: &str, intent: IntentType, entities: &Entities) -> ParsedQuery {
        let lower = query.to_lowercase();
        let mut parsed = ParsedQuery {
            main_action: "general_query".to_string(),
            output_format: "table".to_string(),
            ..ParsedQuery::default()
        };

        match intent {
            IntentType::Visualization => {
                parsed.main_action = "create_visualization".to_string();
                parsed.output_format = if lower.contains("dashboard") {
                    "dashboard".to_string()
                } else {
                    "chart".to_string()
                };
                if let Some(kind) = ["bar", "line", "pie", "scatter"]
                    .iter()
                    .find(|k| lower.contains(*k))
                {
                    parsed
                        .metadata
                        .insert("chart_type".to_string(), kind.to_string());
                }
            }
            IntentType::Comparison => {
                parsed.main_action = if ["between", "vs", "versus"]
                    .iter()
                    .any(|w| lower.contains(w))
                {
                    "comparative_analysis".to_string()
                } else {
                    "compare_data".to_string()
                };
            }
            IntentType::Trend => {
                parsed.main_action = "analyze_trends".to_string();
                if ["quarter", "monthly", "weekly"]
                    .iter()
                    .any(|w| lower.contains(w))
                {
                    push_unique(&mut parsed.dimensions, "time");
                }
            }
            IntentType::Sql => {
                parsed.main_action = "execute_sql".to_string();
            }
            IntentType::Analytics => {
                parsed.main_action = "analyze_data".to_string();
                if lower.contains("sales") || lower.contains("revenue") {
                    push_unique(&mut parsed.metrics, "revenue");
                }
                if lower.contains("performance") || lower.contains("kpi") {
                    parsed.metadata.insert(
                        "analysis_type".to_string(),
                        "performance_analysis".to_string(),
                    );
                }
            }
            IntentType::Filter
            | IntentType::Aggregation
            | IntentType::Join
            | IntentType::Unknown => {}
        }

        let aggregation_words = entities.get(AGGREGATIONS).cloned().unwrap_or_default();
        for metric in entities.get(METRICS).into_iter().flatten() {
            if !aggregation_words.contains(metric) {
                push_unique(&mut parsed.metrics, metric);
            }
        }

        let field = parsed
            .metrics
            .first()
            .cloned()
            .unwrap_or_else(|| "*".to_string());
        for word in &aggregation_words {
            let function = normalize_aggregation(word);
            if parsed.aggregations.iter().any(|a| a.function == function) {
                continue;
            }
            parsed.aggregations.push(Aggregation {
                function: function.to_string(),
                field: field.clone(),
                alias: Some(format!("{function}_{}", field.replace('*', "all"))),
            });
        }

        if let Some(re) = &self.group_by {
            for caps in re.captures_iter(&lower) {
                let dimension = &caps[1];
                if NON_DIMENSIONS.contains(&dimension) {
                    continue;
                }
                push_unique(&mut parsed.group_by, dimension);
                push_unique(&mut parsed.dimensions, dimension);
            }
        }

        if let Some(re) = &self.comparison_filter {
            for caps in re.captures_iter(&lower) {
                parsed.filters.push(Filter {
                    field: caps[1].to_string(),
                    operator: comparison_operator(&caps[2]).to_string(),
                    value: caps[3].to_string(),
                });
            }
        }

        if let Some(caps) = self.ranking.as_ref().and_then(|re| re.captures(&lower)) {
            parsed.limit = caps[2].parse().ok();
            let direction = if &caps[1] == "top" {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            parsed.sort.push(SortCriteria {
                field: field.clone(),
                direction,
            });
        }

        parsed.time_range = time_range(entities);
        parsed
    }
}

impl Default for QueryStructureParser {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Skipping invalid query pattern {}: {}", pattern, e);
            None
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

fn normalize_aggregation(word: &str) -> &'static str {
    match word {
        "avg" | "average" => "avg",
        "count" => "count",
        "max" => "max",
        "min" => "min",
        _ => "sum",
    }
}

fn comparison_operator(phrase: &str) -> &'static str {
    match phrase {
        "greater than" | "more than" | "above" | "over" => ">",
        "less than" | "below" | "under" => "<",
        _ => "=",
    }
}

fn time_range(entities: &Entities) -> Option<TimeRange> {
    let first = |key: &str| entities.get(key).and_then(|v| v.first()).cloned();

    first(TIME_WINDOWS)
        .map(|period| TimeRange {
            period,
            relative: true,
        })
        .or_else(|| {
            first(DATES).map(|period| TimeRange {
                period,
                relative: false,
            })
        })
        .or_else(|| {
            first(RELATIVE_DAYS).map(|period| TimeRange {
                period,
                relative: true,
            })
        })
}
