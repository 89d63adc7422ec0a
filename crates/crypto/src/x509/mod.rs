// Path: crates/crypto/src/x509/mod.rs
//! X.509 certificate and CSR handling: DER parsing, template-driven
//! building with opaque-key signing, and signature/chain verification.

pub mod builder;
pub mod parser;
pub mod verify;

use crate::asn1::{decoder, writer, TAG_BIT_STRING, TAG_GENERALIZED_TIME, TAG_UTC_TIME};
use crate::error::{Error, Result};
use aegis_api::crypto::ParseOptions;
use aegis_types::crypto::PublicKey;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::SystemTime;

/// rsaEncryption.
pub const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
/// sha1WithRSAEncryption.
pub const OID_SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
/// sha224WithRSAEncryption.
pub const OID_SHA224_WITH_RSA: &str = "1.2.840.113549.1.1.14";
/// sha256WithRSAEncryption.
pub const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
/// sha384WithRSAEncryption.
pub const OID_SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
/// sha512WithRSAEncryption.
pub const OID_SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
/// id-ecPublicKey.
pub const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
/// ecdsa-with-SHA1.
pub const OID_ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";
/// ecdsa-with-SHA224.
pub const OID_ECDSA_WITH_SHA224: &str = "1.2.840.10045.4.3.1";
/// ecdsa-with-SHA256.
pub const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
/// ecdsa-with-SHA384.
pub const OID_ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
/// ecdsa-with-SHA512.
pub const OID_ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
/// id-ce-subjectKeyIdentifier.
pub const OID_SUBJECT_KEY_ID: &str = "2.5.29.14";
/// id-ce-subjectAltName.
pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";
/// id-ce-issuerAltName.
pub const OID_ISSUER_ALT_NAME: &str = "2.5.29.18";
/// id-ce-authorityKeyIdentifier.
pub const OID_AUTHORITY_KEY_ID: &str = "2.5.29.35";
/// id-ce-extKeyUsage.
pub const OID_EXT_KEY_USAGE: &str = "2.5.29.37";
/// pkcs-9 extensionRequest.
pub const OID_EXTENSION_REQUEST: &str = "1.2.840.113549.1.9.14";

/// Formats a timestamp as ASN.1 GeneralizedTime `YYYYMMDDhhmmssZ`.
pub fn format_generalized_time(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y%m%d%H%M%SZ").to_string()
}

/// Parses a UTCTime or GeneralizedTime value into a timestamp.
pub fn parse_asn1_time(tag: u32, content: &[u8]) -> Result<SystemTime> {
    let text = std::str::from_utf8(content)
        .map_err(|_| Error::invalid_argument("bad ASN.1 time encoding"))?;
    let text = text.trim_end_matches('Z');

    let date_len = match tag {
        TAG_UTC_TIME => 6,
        TAG_GENERALIZED_TIME => 8,
        _ => return Err(Error::invalid_argument("bad ASN.1 time tag")),
    };

    if text.len() < date_len + 6 {
        return Err(Error::invalid_argument("bad ASN.1 time length"));
    }
    let date_digits = text
        .get(..date_len)
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time length"))?;
    let time_digits = text
        .get(date_len..)
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time length"))?;

    let year: i32 = match tag {
        TAG_UTC_TIME => {
            let yy: i32 = date_digits
                .get(..2)
                .and_then(|digits| digits.parse().ok())
                .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;
            if yy < 50 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        _ => date_digits
            .get(..4)
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?,
    };

    let month_start = date_digits.len() - 4;
    let month: u32 = date_digits
        .get(month_start..month_start + 2)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;
    let day: u32 = date_digits
        .get(month_start + 2..)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;

    let hour: u32 = time_digits
        .get(..2)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;
    let minute: u32 = time_digits
        .get(2..4)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;
    let second: u32 = time_digits
        .get(4..6)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time"))?;

    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| Error::invalid_argument("bad ASN.1 time value"))?
        .and_utc();

    Ok(datetime.into())
}

/// Encodes a `SubjectPublicKeyInfo` for the given public key.
pub fn encode_spki(public_key: &PublicKey) -> Result<Vec<u8>> {
    match public_key {
        PublicKey::Rsa { modulus, exponent } => {
            let algorithm = writer::encode_sequence(&[
                writer::encode_oid_text(OID_RSA_ENCRYPTION)?.as_slice(),
                writer::encode_null().as_slice(),
            ]);

            let n = writer::encode_integer(modulus);
            let e = writer::encode_integer(exponent);
            let key_der = writer::encode_sequence(&[n.as_slice(), e.as_slice()]);

            Ok(writer::encode_sequence(&[
                algorithm.as_slice(),
                writer::encode_bit_string(&key_der).as_slice(),
            ]))
        }
        PublicKey::Ecdsa { curve_oid, point } => {
            let curve = writer::encode_tlv(crate::asn1::TAG_OID as u8, curve_oid);
            let algorithm = writer::encode_sequence(&[
                writer::encode_oid_text(OID_EC_PUBLIC_KEY)?.as_slice(),
                curve.as_slice(),
            ]);

            Ok(writer::encode_sequence(&[
                algorithm.as_slice(),
                writer::encode_bit_string(point).as_slice(),
            ]))
        }
    }
}

/// Parses a `SubjectPublicKeyInfo` into the tagged public key.
pub fn parse_spki(spki_content: &[u8]) -> Result<PublicKey> {
    let (algorithm, rest) =
        decoder::read_algorithm_identifier(spki_content, &ParseOptions::default())?;
    let algorithm = algorithm.ok_or_else(|| Error::invalid_argument("SPKI without algorithm"))?;

    let (key_bits, _) = decoder::read_raw_value(rest, &ParseOptions::with_tag(TAG_BIT_STRING))?;
    let key_bits = key_bits.ok_or_else(|| Error::invalid_argument("SPKI without key bits"))?;

    // The first BIT STRING content byte is the unused-bit count.
    let key_bytes = key_bits
        .content
        .split_first()
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::invalid_argument("empty SPKI key bits"))?;

    match algorithm.oid.as_str() {
        OID_RSA_ENCRYPTION => {
            let (key_seq, _) = decoder::read_raw_value(
                key_bytes,
                &ParseOptions::with_tag(crate::asn1::TAG_SEQUENCE),
            )?;
            let key_seq =
                key_seq.ok_or_else(|| Error::invalid_argument("bad RSA public key encoding"))?;

            let (modulus, after_n) =
                decoder::read_big_integer(key_seq.content, &ParseOptions::default())?;
            let modulus =
                modulus.ok_or_else(|| Error::invalid_argument("RSA key without modulus"))?;

            let (exponent, _) = decoder::read_big_integer(after_n, &ParseOptions::default())?;
            let exponent =
                exponent.ok_or_else(|| Error::invalid_argument("RSA key without exponent"))?;

            Ok(PublicKey::Rsa { modulus, exponent })
        }
        OID_EC_PUBLIC_KEY => {
            let params = algorithm
                .params
                .ok_or_else(|| Error::invalid_argument("EC key without curve parameters"))?;
            if params.tag_number != crate::asn1::TAG_OID {
                return Err(Error::not_supported("EC curve parameters must be a named curve"));
            }

            Ok(PublicKey::Ecdsa {
                curve_oid: params.content,
                point: key_bytes.to_vec(),
            })
        }
        other => Err(Error::not_supported(format!("public key algorithm {other}"))),
    }
}
