// Path: crates/api/src/error/mod.rs
// Re-export the canonical error types from the central types crate.
pub use aegis_types::error::{Error, ErrorCode};
pub use aegis_types::Result;
