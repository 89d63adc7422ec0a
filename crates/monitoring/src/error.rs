// Path: crates/monitoring/src/error.rs
//! Local error types for the `aegis-monitoring` crate.

// Re-export the canonical error type from the API crate.
pub use aegis_api::error::{Error, ErrorCode, Result};
