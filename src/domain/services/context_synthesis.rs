use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::domain_rules;
use crate::domain::{
    BusinessMetric, ColumnInfo, Connector, Domain, DomainContext, SchemaContext, TableContext,
    TableRelationship,
};

/// Verbs that mark a line as a question a user would type.
const QUERY_VERBS: &[&str] = &[
    "show", "what", "which", "how", "list", "compare", "give", "find", "display", "plot", "who",
    "when", "where",
];

/// Turns scanned tables into business-domain summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSynthesizer;

impl ContextSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        connector: &Connector,
        tables: Vec<TableContext>,
        now: DateTime<Utc>,
    ) -> SchemaContext {
        let tables: Vec<TableContext> = tables
            .into_iter()
            .map(|mut t| {
                t.domain = domain_rules::classify_table(&t);
                t
            })
            .collect();

        let business_metrics = self.business_metrics(&tables);
        let relationships = self.relationships(&tables);
        let sample_queries = self.sample_queries(&business_metrics);
        let (primary_domain, confidence) = self.primary_domain(&tables, &business_metrics);
        let detected_domains = self.domain_contexts(&tables, now);

        SchemaContext {
            connector_id: connector.id().to_string(),
            connector_name: connector.name().to_string(),
            connector_type: connector.connector_type(),
            tables,
            business_metrics,
            relationships,
            sample_queries,
            primary_domain,
            confidence,
            detected_domains,
            analyzed_at: now,
        }
    }

    /// One context per domain, most tables first; ties keep first-seen order.
    pub fn domain_contexts(&self, tables: &[TableContext], now: DateTime<Utc>) -> Vec<DomainContext> {
        let mut groups: Vec<(Domain, Vec<TableContext>)> = Vec::new();
        for table in tables {
            match groups.iter_mut().find(|(d, _)| *d == table.domain) {
                Some((_, members)) => members.push(table.clone()),
                None => groups.push((table.domain.clone(), vec![table.clone()])),
            }
        }
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        groups
            .into_iter()
            .map(|(domain, tables)| self.build_context(domain, tables, now))
            .collect()
    }

    fn build_context(
        &self,
        domain: Domain,
        tables: Vec<TableContext>,
        now: DateTime<Utc>,
    ) -> DomainContext {
        let mut keywords = Vec::new();
        let mut metrics = Vec::new();
        let mut dimensions = Vec::new();

        for table in &tables {
            push_unique(&mut keywords, table.name.to_lowercase());
            for tag in &table.business_tags {
                push_unique(&mut keywords, tag.to_lowercase());
            }
            for column in &table.columns {
                if column.is_metric {
                    push_unique(&mut metrics, column.name.clone());
                    push_unique(&mut keywords, column.name.to_lowercase());
                }
                if column.is_dimension {
                    push_unique(&mut dimensions, column.name.clone());
                    push_unique(&mut keywords, column.name.to_lowercase());
                }
            }
        }

        let mut context = DomainContext {
            description: domain_rules::describe(&domain, tables.len()),
            glossary: domain_rules::glossary(&domain),
            query_patterns: domain_rules::query_patterns(&domain, &keywords, !metrics.is_empty()),
            domain,
            keywords,
            metrics,
            dimensions,
            tables,
            confidence: 0.0,
            last_updated: now,
            auto_generated: true,
        };
        context.confidence = self.domain_confidence(&context);
        context
    }

    /// Data-richness score clamped to `[0.3, 1.0]`.
    pub fn domain_confidence(&self, context: &DomainContext) -> f64 {
        let mut score = 0.2 * context.tables.len() as f64
            + 0.1 * context.metrics.len() as f64
            + 0.05 * context.dimensions.len() as f64;

        let expected = domain_rules::expected_keywords(&context.domain);
        if !expected.is_empty() {
            let matched = expected
                .iter()
                .filter(|e| context.keywords.iter().any(|k| k.contains(*e)))
                .count();
            score += matched as f64 / expected.len() as f64 * 0.3;
        }

        score.clamp(0.3, 1.0)
    }

    /// Winning domain and its share of the total score. Exactly 0.5 when nothing is specific.
    pub fn primary_domain(
        &self,
        tables: &[TableContext],
        metrics: &[BusinessMetric],
    ) -> (Domain, f64) {
        if tables.iter().all(|t| t.domain.is_general()) {
            return (Domain::GENERAL, 0.5);
        }

        let mut scores: HashMap<Domain, f64> = HashMap::new();
        for table in tables {
            let entry = scores.entry(table.domain.clone()).or_insert(0.0);
            *entry += 1.0 + 0.5 * table.metric_columns().count() as f64;
        }
        for metric in metrics {
            *scores.entry(metric.domain.clone()).or_insert(0.0) += 0.5;
        }

        let total: f64 = scores.values().sum();
        let mut ranked: Vec<(Domain, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| domain_rules::rule_rank(&a.0).cmp(&domain_rules::rule_rank(&b.0)))
                .then_with(|| a.0.cmp(&b.0))
        });

        match ranked.into_iter().next() {
            Some((domain, best)) if total > 0.0 => (domain, best / total),
            _ => (Domain::GENERAL, 0.5),
        }
    }

    pub fn business_metrics(&self, tables: &[TableContext]) -> Vec<BusinessMetric> {
        let mut metrics = Vec::new();
        for table in tables {
            let dimensions: Vec<String> =
                table.dimension_columns().map(|c| c.name.clone()).collect();
            for column in table.metric_columns() {
                metrics.push(BusinessMetric {
                    name: domain_rules::metric_name(&column.name, &table.name),
                    description: domain_rules::metric_description(&column.name, &table.name),
                    aggregation: domain_rules::infer_aggregation(&column.name),
                    source_table: table.name.clone(),
                    source_column: column.name.clone(),
                    dimensions: dimensions.clone(),
                    domain: table.domain.clone(),
                    keywords: domain_rules::metric_keywords(&column.name, &table.name),
                });
            }
        }
        metrics
    }

    pub fn relationships(&self, tables: &[TableContext]) -> Vec<TableRelationship> {
        let mut relationships = Vec::new();
        for (i, left) in tables.iter().enumerate() {
            for right in tables.iter().skip(i + 1) {
                for lc in &left.columns {
                    for rc in &right.columns {
                        if is_relationship(lc, rc, &left.name, &right.name) {
                            relationships.push(TableRelationship {
                                from_table: left.name.clone(),
                                from_column: lc.name.clone(),
                                to_table: right.name.clone(),
                                to_column: rc.name.clone(),
                                relation: "one_to_many".to_string(),
                                confidence: 0.8,
                            });
                        }
                    }
                }
            }
        }
        relationships
    }

    pub fn sample_queries(&self, metrics: &[BusinessMetric]) -> Vec<String> {
        let mut queries = Vec::new();
        for metric in metrics {
            for q in domain_rules::sample_queries(&metric.domain) {
                push_unique(&mut queries, q.to_string());
            }
        }
        queries
    }

    /// Prompt asking a generative model for extra example questions about a schema.
    pub fn suggestion_prompt(&self, schema: &SchemaContext) -> String {
        let tables: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        let metrics: Vec<&str> = schema
            .business_metrics
            .iter()
            .map(|m| m.name.as_str())
            .collect();

        format!(
            "Given this business data schema, generate natural language queries that users might ask:\n\n\
             Primary Domain: {}\nTables: {}\nKey Metrics: {}\n\n\
             Generate 5-8 sample queries that business users would naturally ask about this data. \
             Put each query on its own line.",
            schema.primary_domain,
            tables.join(", "),
            metrics.join(", ")
        )
    }

    /// Keeps only the query-shaped lines of a generative answer.
    pub fn parse_suggestions(&self, response: &str) -> Vec<String> {
        let mut queries = Vec::new();
        for line in response.lines() {
            let line = strip_list_marker(line);
            if is_query_shaped(line) {
                push_unique(&mut queries, line.to_string());
            }
        }
        queries
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn singular(name: &str) -> &str {
    name.strip_suffix('s').unwrap_or(name)
}

fn is_relationship(left: &ColumnInfo, right: &ColumnInfo, left_table: &str, right_table: &str) -> bool {
    if !(left.is_id && right.is_id) {
        return false;
    }
    let l = left.name.to_lowercase();
    let r = right.name.to_lowercase();
    if l == r {
        return l != "id";
    }
    (r == "id" && l.contains(&singular(&right_table.to_lowercase()).to_string()))
        || (l == "id" && r.contains(&singular(&left_table.to_lowercase()).to_string()))
}

fn strip_list_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | '•'))
        .trim()
        .trim_matches('"')
        .trim()
}

/// Longer than ten characters and either a question or led by a query verb.
pub fn is_query_shaped(line: &str) -> bool {
    if line.chars().count() <= 10 {
        return false;
    }
    if line.contains('?') {
        return true;
    }
    let lower = line.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| QUERY_VERBS.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectorStatus, ConnectorType};

    fn col(name: &str, ty: &str) -> ColumnInfo {
        ColumnInfo::infer(name, ty)
    }

    fn shop_tables() -> Vec<TableContext> {
        vec![
            TableContext::new(
                "orders",
                vec![
                    col("id", "integer"),
                    col("customer_id", "integer"),
                    col("total_amount", "decimal"),
                    col("status", "varchar"),
                ],
            ),
            TableContext::new(
                "customers",
                vec![
                    col("customer_id", "integer"),
                    col("region", "varchar"),
                    col("segment", "varchar"),
                ],
            ),
            TableContext::new(
                "products",
                vec![col("id", "integer"), col("price", "decimal"), col("name", "text")],
            ),
        ]
    }

    fn connector() -> Connector {
        Connector::new("pg-1", "Shop DB", ConnectorType::Postgres, ConnectorStatus::Connected)
    }

    #[test]
    fn analyze_groups_tables_by_domain() {
        let schema = ContextSynthesizer::new().analyze(&connector(), shop_tables(), Utc::now());

        let domains: Vec<&str> = schema
            .detected_domains
            .iter()
            .map(|d| d.domain.as_str())
            .collect();
        assert_eq!(domains, vec!["sales", "customer", "product"]);
        assert_eq!(schema.business_metrics.len(), 2);
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].from_column, "customer_id");
        assert!(schema
            .sample_queries
            .contains(&"Show me total sales revenue".to_string()));
    }

    #[test]
    fn sales_context_content() {
        let schema = ContextSynthesizer::new().analyze(&connector(), shop_tables(), Utc::now());
        let sales = &schema.detected_domains[0];

        assert_eq!(
            sales.description,
            "Sales and revenue analytics, order management, customer transactions"
        );
        assert_eq!(sales.metrics, vec!["total_amount"]);
        assert_eq!(sales.dimensions, vec!["status"]);
        assert_eq!(sales.glossary.len(), 2);
        assert_eq!(sales.query_patterns.len(), 2);
        assert!(sales.auto_generated);
        // 0.2 + 0.1 + 0.05 + 0.3 * 1/4 ("order" is the only expected keyword present)
        assert!((sales.confidence - 0.425).abs() < 1e-9);
    }

    #[test]
    fn domain_confidence_stays_in_bounds() {
        let synthesizer = ContextSynthesizer::new();
        let now = Utc::now();

        let sparse = synthesizer.domain_contexts(
            &[TableContext {
                domain: Domain::HR,
                ..TableContext::new("staff", vec![])
            }],
            now,
        );
        assert_eq!(sparse[0].confidence, 0.3);

        let many: Vec<TableContext> = (0..8)
            .map(|i| TableContext {
                domain: Domain::SALES,
                ..TableContext::new(format!("orders_{i}"), vec![col("amount", "decimal")])
            })
            .collect();
        let rich = synthesizer.domain_contexts(&many, now);
        assert_eq!(rich[0].confidence, 1.0);
        assert!(rich[0].description.ends_with("with 8 related data sources"));
    }

    #[test]
    fn all_general_tables_give_half_confidence() {
        let synthesizer = ContextSynthesizer::new();
        let tables = vec![
            TableContext::new("misc", vec![col("x", "int")]),
            TableContext::new("other", vec![col("y", "int")]),
        ];
        let schema = synthesizer.analyze(&connector(), tables, Utc::now());
        assert_eq!(schema.primary_domain, Domain::GENERAL);
        assert_eq!(schema.confidence, 0.5);

        assert_eq!(synthesizer.primary_domain(&[], &[]), (Domain::GENERAL, 0.5));
    }

    #[test]
    fn primary_domain_is_share_of_total_score() {
        let schema = ContextSynthesizer::new().analyze(&connector(), shop_tables(), Utc::now());
        // sales: 1 + 0.5 + 0.5, customer: 1, product: 1 + 0.5 + 0.5
        assert_eq!(schema.primary_domain, Domain::SALES);
        assert!((schema.confidence - 2.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn suggestions_keep_only_query_shaped_lines() {
        let response = "Here are some ideas:\n\
                        1. What is the average order value?\n\
                        2. Show revenue by region\n\
                        - ok\n\
                        3. Revenue per store\n\
                        4. What is the average order value?";
        let parsed = ContextSynthesizer::new().parse_suggestions(response);
        assert_eq!(
            parsed,
            vec!["What is the average order value?", "Show revenue by region"]
        );
    }

    #[test]
    fn query_shape_heuristic() {
        assert!(is_query_shaped("How many users signed up?"));
        assert!(is_query_shaped("list all open invoices"));
        assert!(!is_query_shaped("short?"));
        assert!(!is_query_shaped("Revenue per store"));
    }
}
