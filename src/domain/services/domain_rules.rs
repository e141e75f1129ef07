//! Rule data for business-domain inference. Adding a domain means adding rows here.

use crate::domain::{AggregationType, Domain, GlossaryTerm, IntentType, QueryPattern, TableContext};

/// Ordered domain keyword rules; the first rule that matches wins.
pub const TABLE_RULES: &[(Domain, &[&str])] = &[
    (
        Domain::SALES,
        &[
            "order", "sale", "transaction", "purchase", "invoice", "receipt", "payment", "billing",
            "checkout",
        ],
    ),
    (
        Domain::MARKETING,
        &[
            "campaign",
            "lead",
            "prospect",
            "marketing",
            "advertisement",
            "email",
            "newsletter",
            "promotion",
            "coupon",
            "affiliate",
        ],
    ),
    (
        Domain::CUSTOMER,
        &[
            "customer",
            "user",
            "client",
            "account",
            "profile",
            "contact",
            "member",
            "subscriber",
        ],
    ),
    (
        Domain::PRODUCT,
        &[
            "product", "item", "catalog", "inventory", "stock", "sku", "variant", "category",
            "brand",
        ],
    ),
    (
        Domain::FINANCE,
        &[
            "finance",
            "accounting",
            "revenue",
            "expense",
            "budget",
            "cost",
            "profit",
            "tax",
            "payroll",
            "investment",
        ],
    ),
    (
        Domain::OPERATIONS,
        &[
            "operation", "process", "workflow", "task", "job", "schedule", "resource", "asset",
            "facility",
        ],
    ),
    (
        Domain::HR,
        &[
            "employee",
            "staff",
            "personnel",
            "hr",
            "human",
            "department",
            "position",
            "salary",
            "benefit",
        ],
    ),
];

/// Position of a domain in the rule order; unknown domains sort last.
pub fn rule_rank(domain: &Domain) -> usize {
    TABLE_RULES
        .iter()
        .position(|(d, _)| d == domain)
        .unwrap_or(TABLE_RULES.len())
}

fn matching_rule<'a>(text: &str) -> Option<&'a Domain> {
    let text = text.to_lowercase();
    TABLE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(domain, _)| domain)
}

/// Table name first, then business tags, then column names. Defaults to `general`.
pub fn classify_table(table: &TableContext) -> Domain {
    if let Some(domain) = matching_rule(&table.name) {
        return domain.clone();
    }
    for tag in &table.business_tags {
        if let Some(domain) = matching_rule(tag) {
            return domain.clone();
        }
    }
    for column in &table.columns {
        if let Some(domain) = matching_rule(&column.name) {
            return domain.clone();
        }
    }
    Domain::GENERAL
}

/// Domain named by the first rule keyword found in free text.
pub fn domain_for_text(text: &str) -> Option<Domain> {
    matching_rule(text).cloned()
}

pub fn base_description(domain: &Domain) -> &'static str {
    match domain.as_str() {
        "sales" => "Sales and revenue analytics, order management, customer transactions",
        "marketing" => "Marketing campaign performance, lead generation, customer acquisition",
        "customer" => "Customer relationship management, user profiles, engagement metrics",
        "product" => "Product catalog, inventory management, pricing and categorization",
        "finance" => "Financial reporting, accounting, revenue and expense tracking",
        "operations" => "Operational efficiency, process management, resource utilization",
        "hr" => "Human resources, employee management, organizational analytics",
        "general" => "General business data and analytics",
        _ => "Business data and analytics",
    }
}

pub fn describe(domain: &Domain, table_count: usize) -> String {
    let base = base_description(domain);
    if table_count > 1 {
        format!("{base} with {table_count} related data sources")
    } else {
        base.to_string()
    }
}

/// Keywords a well-populated context for the domain is expected to contain.
pub fn expected_keywords(domain: &Domain) -> &'static [&'static str] {
    match domain.as_str() {
        "sales" => &["sales", "order", "revenue", "customer"],
        "marketing" => &["campaign", "lead", "marketing", "conversion"],
        "customer" => &["customer", "user", "profile", "engagement"],
        "product" => &["product", "inventory", "catalog", "price"],
        "finance" => &["finance", "payment", "invoice", "revenue"],
        _ => &[],
    }
}

fn term(domain: &Domain, term: &str, definition: &str, synonyms: &[&str]) -> GlossaryTerm {
    GlossaryTerm {
        term: term.to_string(),
        definition: definition.to_string(),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        domain: domain.clone(),
    }
}

pub fn glossary(domain: &Domain) -> Vec<GlossaryTerm> {
    match domain.as_str() {
        "sales" => vec![
            term(
                domain,
                "Revenue",
                "Total income generated from sales transactions",
                &["income", "sales", "earnings"],
            ),
            term(
                domain,
                "Conversion Rate",
                "Percentage of prospects that become customers",
                &["conversion", "close rate"],
            ),
        ],
        "marketing" => vec![
            term(
                domain,
                "CAC",
                "Customer Acquisition Cost - cost to acquire one customer",
                &["acquisition cost", "customer cost"],
            ),
            term(
                domain,
                "ROAS",
                "Return on Ad Spend - revenue per dollar spent on advertising",
                &["ad return", "advertising roi"],
            ),
        ],
        "customer" => vec![
            term(
                domain,
                "LTV",
                "Customer Lifetime Value - total revenue from customer relationship",
                &["lifetime value", "customer value"],
            ),
            term(
                domain,
                "Churn Rate",
                "Percentage of customers who stop using service",
                &["churn", "attrition rate"],
            ),
        ],
        _ => Vec::new(),
    }
}

fn pattern(
    pattern: &str,
    description: &str,
    intent: IntentType,
    keywords: &[&str],
    examples: &[&str],
) -> QueryPattern {
    QueryPattern {
        pattern: pattern.to_string(),
        description: description.to_string(),
        intent,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        examples: examples.iter().map(|s| s.to_string()).collect(),
    }
}

/// Domain query templates plus a generic trend pattern when the domain has metrics.
pub fn query_patterns(domain: &Domain, keywords: &[String], has_metrics: bool) -> Vec<QueryPattern> {
    let mut patterns = match domain.as_str() {
        "sales" => vec![pattern(
            "sales performance analysis",
            "Analysis of sales metrics and performance trends",
            IntentType::Analytics,
            &["sales", "performance", "revenue", "orders"],
            &["show me sales data", "sales performance", "revenue analysis"],
        )],
        "marketing" => vec![pattern(
            "marketing campaign analysis",
            "Analysis of marketing campaign effectiveness",
            IntentType::Analytics,
            &["marketing", "campaign", "leads", "conversion"],
            &["campaign performance", "lead generation", "marketing roi"],
        )],
        "customer" => vec![pattern(
            "customer behavior analysis",
            "Analysis of customer behavior and engagement patterns",
            IntentType::Analytics,
            &["customer", "behavior", "engagement", "retention"],
            &["customer insights", "user engagement", "customer segmentation"],
        )],
        _ => Vec::new(),
    };

    if has_metrics {
        let label = domain.as_str();
        let mut trend_keywords: Vec<String> = keywords.iter().take(3).cloned().collect();
        trend_keywords.push("trend".to_string());
        trend_keywords.push("over time".to_string());
        patterns.push(QueryPattern {
            pattern: format!("{label} trend analysis"),
            description: format!("Time-based trend analysis for {label} metrics"),
            intent: IntentType::Trend,
            keywords: trend_keywords,
            examples: vec![format!("{label} trends"), "trends over time".to_string()],
        });
    }

    patterns
}

/// Templated example questions for a domain.
pub fn sample_queries(domain: &Domain) -> &'static [&'static str] {
    match domain.as_str() {
        "sales" => &[
            "Show me total sales revenue",
            "What are our top selling products?",
            "How many orders did we have this month?",
        ],
        "marketing" => &[
            "Show me campaign performance",
            "What's our lead conversion rate?",
            "Which marketing channels are most effective?",
        ],
        "customer" => &[
            "Show me customer segmentation",
            "What's our customer lifetime value?",
            "How many new customers this quarter?",
        ],
        _ => &[],
    }
}

pub fn infer_aggregation(column: &str) -> AggregationType {
    let name = column.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["amount", "total", "revenue", "price"]) {
        AggregationType::Sum
    } else if has(&["count", "quantity", "num"]) {
        AggregationType::Count
    } else if has(&["rate", "percentage"]) {
        AggregationType::Avg
    } else if has(&["ratio"]) {
        AggregationType::Ratio
    } else {
        AggregationType::Sum
    }
}

fn title_case(text: &str) -> String {
    text.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn singular(table: &str) -> &str {
    table.strip_suffix('s').unwrap_or(table)
}

pub fn metric_name(column: &str, table: &str) -> String {
    let name = title_case(column);
    if name.to_lowercase().contains(&table.to_lowercase()) {
        name
    } else {
        format!("{} {}", title_case(singular(table)), name)
    }
}

pub fn metric_description(column: &str, table: &str) -> String {
    let name = column.to_lowercase();
    let table = table.to_lowercase();
    let readable = column.replace('_', " ");

    if name.contains("total") || name.contains("amount") {
        format!("Total {readable} from {table}")
    } else if name.contains("count") {
        format!("Number of records in {table}")
    } else if name.contains("revenue") {
        format!("Revenue generated from {table}")
    } else if name.contains("price") {
        format!("Price information from {table}")
    } else {
        format!("{} metric from {table} table", title_case(column))
    }
}

pub fn metric_keywords(column: &str, table: &str) -> Vec<String> {
    let name = column.to_lowercase();
    let table = table.to_lowercase();
    let mut keywords = vec![
        name.clone(),
        name.replace('_', " "),
        table.clone(),
        singular(&table).to_string(),
    ];

    let extra: &[&str] = if name.contains("amount") || name.contains("revenue") {
        &["money", "sales", "income", "revenue"]
    } else if name.contains("count") || name.contains("quantity") {
        &["number", "total", "count"]
    } else if name.contains("rate") {
        &["percentage", "ratio", "rate"]
    } else {
        &[]
    };
    keywords.extend(extra.iter().map(|s| s.to_string()));

    let mut seen = Vec::new();
    keywords.retain(|k| {
        if seen.contains(k) {
            false
        } else {
            seen.push(k.clone());
            true
        }
    });
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnInfo;

    #[test]
    fn table_name_wins_over_tags_and_columns() {
        let table = TableContext::new("orders", vec![ColumnInfo::infer("customer_id", "int")])
            .with_tags(vec!["marketing".into()]);
        assert_eq!(classify_table(&table), Domain::SALES);
    }

    #[test]
    fn tags_then_columns_are_consulted() {
        let tagged = TableContext::new("t1", vec![]).with_tags(vec!["Campaigns".into()]);
        assert_eq!(classify_table(&tagged), Domain::MARKETING);

        let by_column = TableContext::new("t2", vec![ColumnInfo::infer("salary", "numeric")]);
        assert_eq!(classify_table(&by_column), Domain::HR);

        let unknown = TableContext::new("misc", vec![ColumnInfo::infer("x", "int")]);
        assert_eq!(classify_table(&unknown), Domain::GENERAL);
    }

    #[test]
    fn description_is_qualified_by_table_count() {
        assert_eq!(
            describe(&Domain::SALES, 1),
            "Sales and revenue analytics, order management, customer transactions"
        );
        assert!(describe(&Domain::SALES, 3).ends_with(" with 3 related data sources"));
        assert_eq!(describe(&Domain::new("logistics"), 1), "Business data and analytics");
    }

    #[test]
    fn trend_pattern_only_with_metrics() {
        let keywords = vec!["orders".to_string()];
        let with = query_patterns(&Domain::SALES, &keywords, true);
        assert_eq!(with.len(), 2);
        assert_eq!(with[1].pattern, "sales trend analysis");
        assert_eq!(with[1].intent, IntentType::Trend);

        let without = query_patterns(&Domain::SALES, &keywords, false);
        assert_eq!(without.len(), 1);
        assert!(query_patterns(&Domain::HR, &keywords, false).is_empty());
    }

    #[test]
    fn aggregation_inference_from_column_names() {
        assert_eq!(infer_aggregation("total_amount"), AggregationType::Sum);
        assert_eq!(infer_aggregation("item_quantity"), AggregationType::Count);
        assert_eq!(infer_aggregation("churn_rate"), AggregationType::Avg);
        assert_eq!(infer_aggregation("debt_ratio"), AggregationType::Ratio);
        assert_eq!(infer_aggregation("weight"), AggregationType::Sum);
    }

    #[test]
    fn metric_naming() {
        assert_eq!(metric_name("total_amount", "orders"), "Order Total Amount");
        assert_eq!(metric_name("orders_count", "orders"), "Orders Count");
        assert_eq!(
            metric_description("total_amount", "orders"),
            "Total total amount from orders"
        );
        let keywords = metric_keywords("revenue", "sales");
        assert_eq!(keywords[..4], ["revenue", "sales", "sale", "money"]);
    }
}
