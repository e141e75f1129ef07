use crate::domain::{Intent, IntentType};

/// Trigger phrases for one intent label.
struct IntentRule {
    intent: IntentType,
    triggers: &'static [&'static str],
}

/// Rules in tie-break priority order: on equal scores the earlier rule wins.
const RULES: &[IntentRule] = &[
    IntentRule {
        intent: IntentType::Comparison,
        triggers: &[
            "compare",
            "comparison",
            "versus",
            "vs",
            "difference",
            "between",
            "against",
            "relative to",
            "compared to",
        ],
    },
    IntentRule {
        intent: IntentType::Trend,
        triggers: &[
            "trend",
            "over time",
            "time series",
            "growth",
            "decline",
            "pattern",
            "monthly",
            "weekly",
            "daily",
            "quarterly",
            "yearly",
            "forecast",
        ],
    },
    IntentRule {
        intent: IntentType::Join,
        triggers: &[
            "join",
            "combine",
            "merge",
            "together with",
            "across sources",
            "link",
        ],
    },
    IntentRule {
        intent: IntentType::Visualization,
        triggers: &[
            "chart",
            "graph",
            "plot",
            "dashboard",
            "visualize",
            "visualization",
            "show",
            "display",
            "bar chart",
            "line chart",
            "pie chart",
            "scatter",
        ],
    },
    IntentRule {
        intent: IntentType::Sql,
        triggers: &[
            "select ",
            " from ",
            "group by",
            "order by",
            "having ",
            "sql",
            "query",
            "execute",
        ],
    },
    IntentRule {
        intent: IntentType::Analytics,
        triggers: &[
            "analyze",
            "analysis",
            "insight",
            "understand",
            "explain",
            "why",
            "performance",
            "metric",
            "kpi",
            "report",
            "summary",
            "sales",
            "revenue",
        ],
    },
    IntentRule {
        intent: IntentType::Aggregation,
        triggers: &[
            "sum", "count", "average", "max", "min", "total", "aggregate", "group", " by ",
            " per ", "each",
        ],
    },
    IntentRule {
        intent: IntentType::Filter,
        triggers: &[
            "filter",
            "where",
            "only",
            "exclude",
            "include",
            "containing",
            "matching",
            "equal to",
            "greater than",
            "less than",
        ],
    },
];

pub const UNKNOWN_CONFIDENCE: f64 = 0.3;

/// Outcome of scoring a query against the trigger table.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub intent: IntentType,
    pub score: usize,
    pub confidence: f64,
    pub triggers: Vec<&'static str>,
}

/// Keyword-trigger intent classifier. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternClassifier;

impl PatternClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, query: &str) -> PatternMatch {
        // Pad so the space-delimited triggers also match at the edges.
        let text = format!(" {} ", query.trim().to_lowercase());

        let mut best: Option<(IntentType, Vec<&'static str>)> = None;
        for rule in RULES {
            let hits: Vec<&'static str> = rule
                .triggers
                .iter()
                .copied()
                .filter(|t| text.contains(t))
                .collect();
            let beats = match &best {
                None => !hits.is_empty(),
                Some((_, best_hits)) => hits.len() > best_hits.len(),
            };
            if beats {
                best = Some((rule.intent, hits));
            }
        }

        match best {
            Some((intent, triggers)) => PatternMatch {
                intent,
                score: triggers.len(),
                confidence: confidence_for_score(triggers.len()),
                triggers,
            },
            None => PatternMatch {
                intent: IntentType::Unknown,
                score: 0,
                confidence: UNKNOWN_CONFIDENCE,
                triggers: Vec::new(),
            },
        }
    }

    pub fn classify(&self, query: &str) -> Intent {
        let matched = self.score(query);
        let mut intent = Intent::new(matched.intent, matched.confidence)
            .with_parameter("classifier", "pattern")
            .with_parameter("score", matched.score.to_string());
        if !matched.triggers.is_empty() {
            intent = intent.with_parameter("triggers", matched.triggers.join(","));
        }
        intent
    }
}

fn confidence_for_score(score: usize) -> f64 {
    match score {
        0 => UNKNOWN_CONFIDENCE,
        1 => 0.7,
        2 => 0.8,
        _ => 0.9,
    }
}
