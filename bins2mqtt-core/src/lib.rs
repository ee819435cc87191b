//! Core types and service wiring for the bins2mqtt collection bridge.

/// Domain models for bin categories and collection schedules.
pub mod model;
/// Traits describing the fetch and publish seams plus their error types.
pub mod ports;
/// High-level service facade used by the binary.
pub mod service;

pub use model::*;
pub use ports::*;
pub use service::*;
