// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

//! # Aegis Telemetry
//!
//! Observability bootstrap for the Aegis edge runtime: structured logging
//! initialization for services and a lightweight variant for tests. The
//! core crates instrument through the `log` facade; this crate routes
//! those records into `tracing`.

/// The initialization routines for global structured logging.
pub mod init;

pub use init::{init_test_logging, init_tracing};
