use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::Commands;

use super::container::Container;
use super::controller::{
    AnalyzeController, ConnectorsController, IngestController, PlanController, QueryController,
};

pub struct Router<'a> {
    plan_controller: PlanController<'a>,
    analyze_controller: AnalyzeController<'a>,
    ingest_controller: IngestController<'a>,
    query_controller: QueryController<'a>,
    connectors_controller: ConnectorsController<'a>,
    cancel: CancellationToken,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            plan_controller: PlanController::new(container),
            analyze_controller: AnalyzeController::new(container),
            ingest_controller: IngestController::new(container),
            query_controller: QueryController::new(container),
            connectors_controller: ConnectorsController::new(container),
            cancel: CancellationToken::new(),
        }
    }

    /// Commands routed after this are aborted when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        let cancel = &self.cancel;
        match command {
            Commands::Plan {
                query,
                connectors,
                context,
                format,
            } => {
                self.plan_controller
                    .plan(query, connectors, context, format, cancel)
                    .await
            }
            Commands::Classify { query, format } => {
                self.plan_controller.classify(query, format, cancel).await
            }
            Commands::Analyze {
                connector_id,
                format,
            } => {
                self.analyze_controller
                    .analyze(connector_id, format, cancel)
                    .await
            }
            Commands::Ingest { target, format } => {
                self.ingest_controller.ingest(target, format, cancel).await
            }
            Commands::Query {
                query,
                connectors,
                context,
                rows,
                format,
            } => {
                self.query_controller
                    .query(query, connectors, context, rows, format, cancel)
                    .await
            }
            Commands::Connectors { format } => self.connectors_controller.list(format).await,
        }
    }
}
