mod classification;
mod connector;
mod domain_context;
mod embedding;
mod ingestion;
mod intent;
mod plan;
mod query;
mod retrieval;
mod task_graph;
mod vector;

pub use classification::*;
pub use connector::*;
pub use domain_context::*;
pub use embedding::*;
pub use ingestion::*;
pub use intent::*;
pub use plan::*;
pub use query::*;
pub use retrieval::*;
pub use task_graph::*;
pub use vector::*;
