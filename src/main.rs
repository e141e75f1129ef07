use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use insightplan::connector::api::{LlmProvider, VectorStoreKind};
use insightplan::{Commands, Container, PlannerConfig, Router};

#[derive(Parser)]
#[command(name = "insightplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Defaults to INSIGHTPLAN_DATA_DIR or ./.insightplan
    #[arg(short, long, global = true)]
    data_dir: Option<String>,

    /// JSON file listing connectors (default: <data-dir>/connectors.json)
    #[arg(long, global = true)]
    connectors: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    vector_store: Option<VectorStoreKind>,

    #[arg(long, global = true)]
    qdrant_url: Option<String>,

    #[arg(long, global = true)]
    mock_embeddings: bool,

    /// Never call a generative model
    #[arg(long, global = true)]
    no_llm: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn planner_config(&self) -> PlannerConfig {
        let mut config = PlannerConfig::from_env();
        if let Some(dir) = &self.data_dir {
            config.data_dir = PathBuf::from(expand_tilde(dir));
        }
        if let Some(path) = &self.connectors {
            config.connectors_file = Some(path.clone());
        }
        if let Some(kind) = self.vector_store {
            config.vector_store = kind;
        }
        if let Some(url) = &self.qdrant_url {
            config.qdrant_url = url.clone();
            if self.vector_store.is_none() {
                config.vector_store = VectorStoreKind::Qdrant;
            }
        }
        config.mock_embeddings |= self.mock_embeddings;
        if self.no_llm {
            config.llm = LlmProvider::None;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.planner_config();
    let container = Container::new(config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight work");
            on_interrupt.cancel();
        }
    });

    let router = Router::new(&container).with_cancellation(cancel);
    let output = router.route(cli.command).await?;
    println!("{}", output);

    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = std::env::var_os("HOME") {
            let home = home.to_string_lossy().to_string();
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/plans"), format!("{home}/plans"));
        }
        assert_eq!(expand_tilde("/tmp/plans"), "/tmp/plans");
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "insightplan",
            "--vector-store",
            "memory",
            "--no-llm",
            "--mock-embeddings",
            "classify",
            "show revenue",
        ]);
        let config = cli.planner_config();
        assert_eq!(config.vector_store, VectorStoreKind::Memory);
        assert_eq!(config.llm, LlmProvider::None);
        assert!(config.mock_embeddings);
    }
}
