// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Aegis API
//!
//! Trait seams between the Aegis core subsystems and their collaborators.
//! The crypto provider facade, the opaque private-key capability, and the
//! monitoring collaborator interfaces are all defined here so that
//! implementations (and test doubles) stay interchangeable.

/// Unified traits for the crypto provider surface.
pub mod crypto;
/// Re-export of the canonical error types.
pub mod error;
/// Collaborator interfaces for the resource monitoring engine.
pub mod monitoring;
