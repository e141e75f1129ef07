//! Hand-curated domain contexts seeded into the vector collection before any connector is scanned.

use chrono::{DateTime, Utc};

use crate::domain::{Domain, DomainContext, GlossaryTerm, IntentType, QueryPattern, TableContext};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn table(domain: &Domain, name: &str, description: &str, tags: &[&str]) -> TableContext {
    TableContext {
        domain: domain.clone(),
        ..TableContext::new(name, Vec::new())
            .with_description(description)
            .with_tags(strings(tags))
    }
}

fn term(domain: &Domain, term: &str, definition: &str, synonyms: &[&str]) -> GlossaryTerm {
    GlossaryTerm {
        term: term.to_string(),
        definition: definition.to_string(),
        synonyms: strings(synonyms),
        domain: domain.clone(),
    }
}

fn analytics_pattern(pattern: &str, description: &str, keywords: &[&str], examples: &[&str]) -> QueryPattern {
    QueryPattern {
        pattern: pattern.to_string(),
        description: description.to_string(),
        intent: IntentType::Analytics,
        keywords: strings(keywords),
        examples: strings(examples),
    }
}

struct Seed {
    domain: Domain,
    description: &'static str,
    keywords: &'static [&'static str],
    metrics: &'static [&'static str],
    dimensions: &'static [&'static str],
}

impl Seed {
    fn into_context(
        self,
        tables: Vec<TableContext>,
        glossary: Vec<GlossaryTerm>,
        patterns: Vec<QueryPattern>,
        now: DateTime<Utc>,
    ) -> DomainContext {
        DomainContext {
            domain: self.domain,
            description: self.description.to_string(),
            keywords: strings(self.keywords),
            metrics: strings(self.metrics),
            dimensions: strings(self.dimensions),
            tables,
            glossary,
            query_patterns: patterns,
            confidence: 1.0,
            last_updated: now,
            auto_generated: false,
        }
    }
}

/// Built-in contexts for sales, marketing, finance, gaming, slack and covid data.
pub fn builtin_contexts(now: DateTime<Utc>) -> Vec<DomainContext> {
    let sales = Domain::SALES;
    let marketing = Domain::MARKETING;
    let finance = Domain::FINANCE;
    let gaming = Domain::GAMING;
    let slack = Domain::SLACK;
    let covid = Domain::COVID;

    vec![
        Seed {
            domain: sales.clone(),
            description: "Sales and revenue analytics, customer orders, product performance",
            keywords: &["sales", "revenue", "orders", "customers", "products", "performance", "conversion"],
            metrics: &["revenue", "orders", "conversion_rate", "avg_order_value"],
            dimensions: &["product_category", "customer_segment", "time_period"],
        }
        .into_context(
            vec![
                table(&sales, "orders", "Customer order transactions", &["sales", "transactions", "customers"]),
                table(&sales, "products", "Product catalog and pricing", &["products", "pricing", "catalog"]),
            ],
            vec![term(&sales, "Revenue", "Total income from sales", &["income", "sales", "earnings"])],
            vec![analytics_pattern(
                "sales performance analysis",
                "Analysis of sales metrics and performance",
                &["sales", "performance", "revenue"],
                &["show me sales data", "sales performance", "revenue analysis"],
            )],
            now,
        ),
        Seed {
            domain: marketing.clone(),
            description: "Marketing campaign performance, lead generation, customer acquisition analytics",
            keywords: &["marketing", "campaign", "leads", "conversion", "acquisition", "cac", "roas", "attribution"],
            metrics: &["cac", "roas", "conversion_rate", "leads", "impressions", "clicks", "ctr"],
            dimensions: &["campaign", "channel", "audience", "time_period"],
        }
        .into_context(
            vec![
                table(&marketing, "campaigns", "Marketing campaign data and performance", &["campaigns", "marketing", "advertising"]),
                table(&marketing, "leads", "Lead generation and conversion data", &["leads", "prospects", "conversion"]),
            ],
            vec![
                term(&marketing, "CAC", "Customer Acquisition Cost - cost to acquire one customer", &["acquisition cost", "customer cost"]),
                term(&marketing, "ROAS", "Return on Ad Spend - revenue per dollar spent on advertising", &["ad return", "advertising roi"]),
            ],
            vec![analytics_pattern(
                "marketing performance analysis",
                "Analysis of marketing campaign effectiveness and ROI",
                &["marketing", "campaign", "performance", "conversion"],
                &["campaign performance", "marketing roi", "lead generation"],
            )],
            now,
        ),
        Seed {
            domain: finance.clone(),
            description: "Financial reporting, accounting, revenue and expense tracking",
            keywords: &["finance", "accounting", "revenue", "expense", "profit", "cash", "budget"],
            metrics: &["revenue", "profit", "expenses", "cash_flow", "margin", "roi"],
            dimensions: &["account", "category", "period", "department"],
        }
        .into_context(
            vec![table(&finance, "transactions", "Financial transaction records", &["finance", "transactions", "accounting"])],
            vec![term(&finance, "ROI", "Return on Investment - profit relative to cost of investment", &["return on investment", "roi"])],
            vec![analytics_pattern(
                "financial analysis",
                "Analysis of financial performance and profitability",
                &["financial", "revenue", "profit", "expenses"],
                &["financial dashboard", "revenue analysis", "profit margins"],
            )],
            now,
        ),
        Seed {
            domain: gaming.clone(),
            description: "Video game sales, gaming industry analytics, platform performance",
            keywords: &["gaming", "video games", "game sales", "platform", "genre", "entertainment"],
            metrics: &["sales", "units_sold", "revenue", "market_share"],
            dimensions: &["platform", "genre", "year", "region"],
        }
        .into_context(
            vec![table(&gaming, "game_sales", "Video game sales data by platform and genre", &["games", "sales", "entertainment"])],
            vec![term(&gaming, "Platform", "Gaming system or console (e.g., PlayStation, Xbox, Nintendo)", &["console", "system", "device"])],
            vec![analytics_pattern(
                "gaming analytics",
                "Analysis of video game sales and performance",
                &["game", "gaming", "video game", "sales"],
                &["video game sales", "gaming data", "game performance"],
            )],
            now,
        ),
        Seed {
            domain: slack.clone(),
            description: "Slack workspace analytics, channel activity, user engagement",
            keywords: &["slack", "channels", "messages", "users", "workspace", "communication"],
            metrics: &["messages", "active_users", "channel_activity", "response_time"],
            dimensions: &["channel", "user", "date", "team"],
        }
        .into_context(
            vec![table(&slack, "slack_channels", "Slack channel activity and engagement metrics", &["slack", "communication", "channels"])],
            Vec::new(),
            vec![analytics_pattern(
                "slack analytics",
                "Analysis of Slack workspace activity and engagement",
                &["slack", "channel", "messages", "communication"],
                &["slack dashboard", "channel activity", "slack metrics"],
            )],
            now,
        ),
        Seed {
            domain: covid.clone(),
            description: "COVID-19 vaccination data, pandemic statistics, public health metrics",
            keywords: &["covid", "vaccine", "vaccination", "pandemic", "health", "immunization"],
            metrics: &["vaccinated", "vaccination_rate", "doses_administered", "population_coverage"],
            dimensions: &["state", "country", "date", "vaccine_type"],
        }
        .into_context(
            vec![table(&covid, "covid_vaccinations", "COVID-19 vaccination data by location and time", &["covid", "vaccination", "health"])],
            Vec::new(),
            vec![analytics_pattern(
                "covid analytics",
                "Analysis of COVID-19 vaccination progress",
                &["covid", "vaccine", "vaccination", "health"],
                &["covid vaccinations", "vaccination rate by state", "vaccine coverage"],
            )],
            now,
        ),
    ]
}
