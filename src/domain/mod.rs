//! Domain layer for the stakeholder aggregation core
//!
//! Models, errors and the ports external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{AggregationError, AggregationResult, ClassificationError, FetchError};
