// Path: crates/crypto/src/asn1/writer.rs
//! DER writer helpers.
//!
//! Each function returns a complete TLV encoding; composites are built by
//! concatenating pre-encoded children, so callers assemble structures
//! inside-out the same way the streaming decoder takes them apart.

use crate::asn1::{
    oid, CLASS_CONTEXT_SPECIFIC, CONSTRUCTED, TAG_BIT_STRING, TAG_GENERALIZED_TIME,
    TAG_IA5_STRING, TAG_INTEGER, TAG_NULL, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE, TAG_SET,
    TAG_UTF8_STRING,
};
use crate::error::Result;

/// Appends DER length octets for `len`.
pub fn encode_len(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&byte| byte == 0).count();
    let digits = bytes.get(skip..).unwrap_or_default();

    out.push(0x80 | digits.len() as u8);
    out.extend_from_slice(digits);
}

/// Encodes one TLV with a raw identifier octet.
pub fn encode_tlv(identifier: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(identifier);
    encode_len(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Encodes a primitive universal TLV.
fn encode_universal(tag: u32, content: &[u8]) -> Vec<u8> {
    encode_tlv(tag as u8, content)
}

/// Encodes a raw buffer verbatim (a pass-through used when composing
/// pre-encoded items).
pub fn encode_raw(content: &[u8]) -> Vec<u8> {
    content.to_vec()
}

/// Encodes a non-negative integer as a DER INTEGER.
pub fn encode_uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|&&byte| byte == 0)
        .count()
        .min(bytes.len() - 1);
    encode_integer(bytes.get(skip..).unwrap_or_default())
}

/// Encodes big-endian magnitude bytes as a positive DER INTEGER: leading
/// zeros are stripped and a 0x00 prefix added when the top bit is set.
pub fn encode_integer(big_endian: &[u8]) -> Vec<u8> {
    let mut bytes = big_endian;
    while bytes.len() > 1 && bytes.first() == Some(&0) {
        bytes = bytes.get(1..).unwrap_or(&[]);
    }

    let needs_pad = bytes.first().map_or(true, |&first| first & 0x80 != 0);

    let mut content = Vec::with_capacity(bytes.len() + 1);
    if bytes.is_empty() {
        content.push(0);
    } else {
        if needs_pad {
            content.push(0);
        }
        content.extend_from_slice(bytes);
    }

    encode_universal(TAG_INTEGER, &content)
}

/// Encodes a NULL.
pub fn encode_null() -> Vec<u8> {
    encode_universal(TAG_NULL, &[])
}

/// Encodes an OBJECT IDENTIFIER from dotted-decimal text.
pub fn encode_oid_text(text: &str) -> Result<Vec<u8>> {
    Ok(encode_universal(TAG_OID, &oid::text_to_content(text)?))
}

/// Encodes an OCTET STRING.
pub fn encode_octet_string(content: &[u8]) -> Vec<u8> {
    encode_universal(TAG_OCTET_STRING, content)
}

/// Encodes a BIT STRING with zero unused bits.
pub fn encode_bit_string(content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 1);
    body.push(0);
    body.extend_from_slice(content);
    encode_universal(TAG_BIT_STRING, &body)
}

/// Encodes a UTF8String.
pub fn encode_utf8_string(text: &str) -> Vec<u8> {
    encode_universal(TAG_UTF8_STRING, text.as_bytes())
}

/// Encodes an IA5String.
pub fn encode_ia5_string(text: &str) -> Vec<u8> {
    encode_universal(TAG_IA5_STRING, text.as_bytes())
}

/// Encodes a GeneralizedTime from a preformatted `YYYYMMDDhhmmssZ` string.
pub fn encode_generalized_time(text: &str) -> Vec<u8> {
    encode_universal(TAG_GENERALIZED_TIME, text.as_bytes())
}

/// Encodes a SEQUENCE of pre-encoded items.
pub fn encode_sequence(items: &[&[u8]]) -> Vec<u8> {
    let mut content = Vec::new();
    for item in items {
        content.extend_from_slice(item);
    }
    encode_tlv(TAG_SEQUENCE as u8 | CONSTRUCTED, &content)
}

/// Encodes a SET of pre-encoded items.
pub fn encode_set(items: &[&[u8]]) -> Vec<u8> {
    let mut content = Vec::new();
    for item in items {
        content.extend_from_slice(item);
    }
    encode_tlv(TAG_SET as u8 | CONSTRUCTED, &content)
}

/// Encodes a context-specific TLV with the given tag number.
pub fn encode_context(tag_number: u8, constructed: bool, content: &[u8]) -> Vec<u8> {
    let mut identifier = CLASS_CONTEXT_SPECIFIC | (tag_number & 0x1f);
    if constructed {
        identifier |= CONSTRUCTED;
    }
    encode_tlv(identifier, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_len_forms() {
        let mut out = Vec::new();
        encode_len(0x7f, &mut out);
        assert_eq!(out, vec![0x7f]);

        out.clear();
        encode_len(0x80, &mut out);
        assert_eq!(out, vec![0x81, 0x80]);

        out.clear();
        encode_len(0x1234, &mut out);
        assert_eq!(out, vec![0x82, 0x12, 0x34]);
    }

    #[test]
    fn test_encode_integer_minimal_positive() {
        // High bit set: a 0x00 pad keeps the INTEGER positive.
        assert_eq!(encode_integer(&[0xff]), vec![0x02, 0x02, 0x00, 0xff]);
        // Leading zeros stripped down to the minimal encoding.
        assert_eq!(encode_integer(&[0x00, 0x00, 0x7f]), vec![0x02, 0x01, 0x7f]);
        // Zero.
        assert_eq!(encode_integer(&[]), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_uint() {
        assert_eq!(encode_uint(0), vec![0x02, 0x01, 0x00]);
        assert_eq!(encode_uint(127), vec![0x02, 0x01, 0x7f]);
        assert_eq!(encode_uint(128), vec![0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn test_encode_bit_string_prefixes_unused_bits() {
        assert_eq!(encode_bit_string(&[0xab]), vec![0x03, 0x02, 0x00, 0xab]);
    }

    #[test]
    fn test_encode_sequence_concatenates_items() {
        let a = encode_uint(1);
        let b = encode_null();
        let seq = encode_sequence(&[a.as_slice(), b.as_slice()]);
        assert_eq!(seq, vec![0x30, 0x05, 0x02, 0x01, 0x01, 0x05, 0x00]);
    }
}
