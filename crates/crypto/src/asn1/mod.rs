// Path: crates/crypto/src/asn1/mod.rs
//! ASN.1 DER primitives: a streaming decoder over borrowed byte slices
//! and a writer for the encodings the X.509 builder needs.
//!
//! The decoder follows the parse-result contract of the provider surface:
//! every reader returns the decoded value together with the bytes
//! remaining after the consumed element, and an `optional` read that does
//! not match reports the element absent while echoing the input back so
//! the caller can fall through.

pub mod decoder;
pub mod dn;
pub mod oid;
pub mod writer;

/// Universal tag number for BOOLEAN.
pub const TAG_BOOLEAN: u32 = 0x01;
/// Universal tag number for INTEGER.
pub const TAG_INTEGER: u32 = 0x02;
/// Universal tag number for BIT STRING.
pub const TAG_BIT_STRING: u32 = 0x03;
/// Universal tag number for OCTET STRING.
pub const TAG_OCTET_STRING: u32 = 0x04;
/// Universal tag number for NULL.
pub const TAG_NULL: u32 = 0x05;
/// Universal tag number for OBJECT IDENTIFIER.
pub const TAG_OID: u32 = 0x06;
/// Universal tag number for UTF8String.
pub const TAG_UTF8_STRING: u32 = 0x0c;
/// Universal tag number for SEQUENCE.
pub const TAG_SEQUENCE: u32 = 0x10;
/// Universal tag number for SET.
pub const TAG_SET: u32 = 0x11;
/// Universal tag number for PrintableString.
pub const TAG_PRINTABLE_STRING: u32 = 0x13;
/// Universal tag number for IA5String.
pub const TAG_IA5_STRING: u32 = 0x16;
/// Universal tag number for UTCTime.
pub const TAG_UTC_TIME: u32 = 0x17;
/// Universal tag number for GeneralizedTime.
pub const TAG_GENERALIZED_TIME: u32 = 0x18;

/// Constructed bit in the identifier octet.
pub const CONSTRUCTED: u8 = 0x20;
/// Context-specific class bits in the identifier octet.
pub const CLASS_CONTEXT_SPECIFIC: u8 = 0x80;
