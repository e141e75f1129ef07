mod classify_domain;
mod classify_intent;
mod context_ingestion;
mod deadline;
mod domain_context_generator;
mod planner;
mod query_processor;
mod source_orchestrator;

pub use classify_domain::*;
pub use classify_intent::*;
pub use context_ingestion::*;
pub use domain_context_generator::*;
pub use planner::*;
pub use query_processor::*;
pub use source_orchestrator::*;
