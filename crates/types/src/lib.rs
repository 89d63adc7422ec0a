// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Aegis Core Types
//!
//! This crate is the foundational library for the Aegis edge runtime,
//! containing all core data structures, error types, and configuration
//! objects shared by the crypto and monitoring subsystems.
//!
//! ## Architectural Role
//!
//! As the base crate, `aegis-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `MonitoringData`, `AlertRule`, `PublicKey`, and the
//! unified error enum.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;

/// Quota alert records emitted by the alert processors.
pub mod alerts;
/// Value types shared by the crypto provider back-ends.
pub mod crypto;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Workload instance identity and lifecycle state.
pub mod instance;
/// Monitoring samples, alert rules, and resource identifiers.
pub mod monitoring;
/// Node hardware description and node-level configuration.
pub mod nodeinfo;
