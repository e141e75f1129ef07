use clap::{Subcommand, ValueEnum};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a query and build its execution plan
    Plan {
        query: String,

        /// Restrict the plan to these connector ids
        #[arg(short, long = "connector")]
        connectors: Vec<String>,

        /// Extra request context as key=value, repeatable
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Route a query to a business domain
    Classify {
        query: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Scan a connector's schema and print the derived business context
    Analyze {
        connector_id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Load domain contexts into the vector store
    Ingest {
        #[command(subcommand)]
        target: IngestTarget,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
        format: OutputFormat,
    },

    /// Plan a query and pull supporting rows from the connectors
    Query {
        query: String,

        #[arg(short, long = "connector")]
        connectors: Vec<String>,

        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,

        /// Print at most this many rows in text output
        #[arg(long, default_value = "10")]
        rows: usize,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List configured connectors
    Connectors {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum IngestTarget {
    /// Built-in domains plus every connected connector
    All,
    /// Built-in domains only
    Domains,
    /// One connector
    Connector { id: String },
    /// Re-scan one connector and overwrite its contexts
    Refresh { id: String },
}

pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs_are_split_once() {
        assert_eq!(
            parse_key_value("user = ana").unwrap(),
            ("user".to_string(), "ana".to_string())
        );
        assert_eq!(
            parse_key_value("filter=a=b").unwrap(),
            ("filter".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
