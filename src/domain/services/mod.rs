//! Pure query-understanding and schema-analysis logic.

mod builtin_contexts;
mod context_synthesis;
pub mod domain_rules;
mod entity_extractor;
mod pattern_classifier;
mod query_structure;
mod task_graph_builder;

pub use builtin_contexts::*;
pub use context_synthesis::*;
pub use entity_extractor::*;
pub use pattern_classifier::*;
pub use query_structure::*;
pub use task_graph_builder::*;
