use regex::Regex;
use tracing::warn;

use crate::domain::Entities;

pub const TIME_WINDOWS: &str = "time_windows";
pub const DATES: &str = "dates";
pub const RELATIVE_DAYS: &str = "relative_days";
pub const METRICS: &str = "metrics";
pub const FILTERS: &str = "filters";
pub const AGGREGATIONS: &str = "aggregations";

const PATTERNS: &[(&str, &[&str])] = &[
    (
        TIME_WINDOWS,
        &[
            r"(?i)\b(?:last|past|previous)\s+(?:\d+\s+)?(?:week|month|quarter|year|day|hour)s?\b",
            r"(?i)\b(?:this|current)\s+(?:week|month|quarter|year|day)\b",
        ],
    ),
    (DATES, &[r"\b\d{4}-\d{2}-\d{2}\b"]),
    (RELATIVE_DAYS, &[r"(?i)\b(?:yesterday|today|tomorrow)\b"]),
    (
        METRICS,
        &[
            r"(?i)\b(?:sales|revenue|profit|cost|price|amount|value)\b",
            r"(?i)\b(?:count|number|quantity|volume|total)\b",
            r"(?i)\b(?:rate|percentage|ratio|proportion)\b",
        ],
    ),
    (FILTERS, &[r"(?i)\b(?:where|filter|only|exclude|include)\b"]),
    (
        AGGREGATIONS,
        &[r"(?i)\b(?:sum|count|avg|average|max|min|total)\b"],
    ),
];

/// Regex battery pulling time expressions, metrics and query operators out of free text.
pub struct EntityExtractor {
    categories: Vec<(&'static str, Vec<Regex>)>,
}

impl EntityExtractor {
    pub fn new() -> Self {
        let categories = PATTERNS
            .iter()
            .map(|(category, patterns)| {
                let compiled = patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!("Skipping invalid {} pattern {}: {}", category, p, e);
                            None
                        }
                    })
                    .collect();
                (*category, compiled)
            })
            .collect();

        Self { categories }
    }

    /// Matches per category, lowercased, de-duplicated, in order of first appearance.
    pub fn extract(&self, query: &str) -> Entities {
        let mut entities = Entities::new();

        for (category, regexes) in &self.categories {
            let mut found: Vec<(usize, String)> = regexes
                .iter()
                .flat_map(|re| re.find_iter(query))
                .map(|m| (m.start(), m.as_str().to_lowercase()))
                .collect();
            found.sort_by_key(|(start, _)| *start);

            let mut matches: Vec<String> = Vec::new();
            for (_, text) in found {
                if !matches.contains(&text) {
                    matches.push(text);
                }
            }

            if !matches.is_empty() {
                entities.insert(category.to_string(), matches);
            }
        }

        entities
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_time_windows_and_metrics() {
        let entities = EntityExtractor::new().extract("Total revenue for the last quarter");

        assert_eq!(entities[TIME_WINDOWS], vec!["last quarter"]);
        assert_eq!(entities[METRICS], vec!["total", "revenue"]);
        assert_eq!(entities[AGGREGATIONS], vec!["total"]);
        assert!(!entities.contains_key(DATES));
    }

    #[test]
    fn extracts_dates_and_relative_days() {
        let entities =
            EntityExtractor::new().extract("orders between 2024-01-01 and 2024-03-31 or yesterday");

        assert_eq!(entities[DATES], vec!["2024-01-01", "2024-03-31"]);
        assert_eq!(entities[RELATIVE_DAYS], vec!["yesterday"]);
    }

    #[test]
    fn counted_windows_are_captured() {
        let entities = EntityExtractor::new().extract("sales over the past 3 months");
        assert_eq!(entities[TIME_WINDOWS], vec!["past 3 months"]);
    }

    #[test]
    fn only_non_empty_categories_are_present() {
        let entities = EntityExtractor::new().extract("hello world");
        assert!(entities.is_empty());
    }

    #[test]
    fn matches_are_deduplicated() {
        let entities = EntityExtractor::new().extract("only sales, only SALES");
        assert_eq!(entities[FILTERS], vec!["only"]);
        assert_eq!(entities[METRICS], vec!["sales"]);
    }
}
