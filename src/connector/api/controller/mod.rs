pub mod analyze_controller;
pub mod connectors_controller;
pub mod ingest_controller;
pub mod plan_controller;
pub mod query_controller;

pub use analyze_controller::AnalyzeController;
pub use connectors_controller::ConnectorsController;
pub use ingest_controller::IngestController;
pub use plan_controller::PlanController;
pub use query_controller::QueryController;
