//! # Domain Layer
//!
//! Core models, the crate error type, and the pure heuristics of the planner:
//! intent patterns, entity extraction, task templates and domain rules.
//! This layer is independent of external frameworks and infrastructure.

mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
