//! Shared domain types for the vitalmon alerting engine.

pub mod id;
pub mod types;
