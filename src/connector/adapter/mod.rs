mod anthropic_client;
mod config_schema_scanner;
mod duckdb_vector_repository;
mod in_memory_result_cache;
mod in_memory_vector_repository;
mod mock_embedding;
mod ollama_embedding;
mod ollama_generator;
mod postgres_client;
mod qdrant_vector_repository;
mod static_connector_registry;
mod superset_client;

pub use anthropic_client::*;
pub use config_schema_scanner::*;
pub use duckdb_vector_repository::*;
pub use in_memory_result_cache::*;
pub use in_memory_vector_repository::*;
pub use mock_embedding::*;
pub use ollama_embedding::*;
pub use ollama_generator::*;
pub use postgres_client::*;
pub use qdrant_vector_repository::*;
pub use static_connector_registry::*;
pub use superset_client::*;
