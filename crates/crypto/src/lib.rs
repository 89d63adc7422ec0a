// Path: crates/crypto/src/lib.rs
//! # Aegis Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
//! # Aegis Cryptography
//!
//! Cryptographic provider implementations for the Aegis edge runtime:
//! ASN.1 DER codec, PEM framing, the opaque private-key registry,
//! hashing/randomness/UUIDs, AES-CBC, and the X.509 builder, parser, and
//! verifier behind the uniform [`aegis_api::crypto::CryptoProvider`]
//! facade.

pub mod aes;
pub mod asn1;
pub mod error;
pub mod hash;
pub mod keyreg;
pub mod pem;
pub mod privkey;
pub mod provider;
pub mod random;
pub mod uuid_gen;
pub mod x509;

pub use provider::{NamedProviderCryptoProvider, OpaqueCryptoProvider};
