//! # Application Layer
//!
//! Collaborator interfaces and the use cases that compose the planning pipeline.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
