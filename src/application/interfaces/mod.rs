mod connector_registry;
mod embedding_service;
mod result_cache;
mod schema_scanner;
mod source_client;
mod text_generator;
mod vector_repository;

pub use connector_registry::*;
pub use embedding_service::*;
pub use result_cache::*;
pub use schema_scanner::*;
pub use source_client::*;
pub use text_generator::*;
pub use vector_repository::*;
