//! # Connector Layer
//!
//! Adapters implementing the application interfaces (embeddings, vector
//! stores, generative models, connector registry, schema scanners, source
//! clients, result cache) and the CLI-facing api that wires them together.

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::{Container, PlannerConfig, Router};
