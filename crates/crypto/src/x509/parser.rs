// Path: crates/crypto/src/x509/parser.rs
//! DER certificate and CSR parsing.

use crate::asn1::{
    decoder, TAG_BIT_STRING, TAG_GENERALIZED_TIME, TAG_INTEGER, TAG_OCTET_STRING, TAG_SEQUENCE,
    TAG_UTC_TIME,
};
use crate::error::{Error, Result};
use crate::pem;
use crate::x509::{
    parse_asn1_time, parse_spki, OID_AUTHORITY_KEY_ID, OID_ISSUER_ALT_NAME, OID_SUBJECT_KEY_ID,
};
use aegis_api::crypto::{AlgorithmIdentifier, Asn1Value, ParseOptions, TagClass};
use aegis_types::crypto::Certificate;
use std::time::SystemTime;

/// The signed envelope of a certificate: the raw to-be-signed bytes, the
/// signature algorithm, and the signature itself. Used by chain
/// verification.
#[derive(Debug, Clone)]
pub struct SignedData {
    /// Complete DER of the TBSCertificate, header included.
    pub tbs_raw: Vec<u8>,
    /// Signature algorithm identifier.
    pub signature_algorithm: AlgorithmIdentifier,
    /// Signature bytes (BIT STRING content, unused-bits octet stripped).
    pub signature: Vec<u8>,
}

fn expect<'a, T>(value: Option<T>, rest: &'a [u8], what: &str) -> Result<(T, &'a [u8])> {
    match value {
        Some(value) => Ok((value, rest)),
        None => Err(Error::invalid_argument(format!("certificate without {what}"))),
    }
}

/// Returns the full TLV (header + content) of the first element in
/// `data`, alongside the remaining bytes.
fn split_raw<'a>(data: &'a [u8]) -> Result<(&'a [u8], Asn1Value<'a>, &'a [u8])> {
    let (value, rest) = decoder::read_raw_value(data, &ParseOptions::default())?;
    let value = value.ok_or_else(|| Error::invalid_argument("truncated certificate"))?;
    let consumed = data.len() - rest.len();
    let raw = data
        .get(..consumed)
        .ok_or_else(|| Error::invalid_argument("truncated certificate"))?;

    Ok((raw, value, rest))
}

/// Parses a complete DER certificate into the data model.
pub fn parse_certificate(der: &[u8]) -> Result<Certificate> {
    let signed = parse_signed(der)?;

    let mut cert = Certificate {
        raw: der.to_vec(),
        ..Certificate::default()
    };

    // TBSCertificate content.
    let (_, tbs, _) = split_raw(&signed.tbs_raw)?;
    if tbs.tag_number != TAG_SEQUENCE || !tbs.constructed {
        return Err(Error::invalid_argument("bad TBSCertificate"));
    }
    let mut cursor = tbs.content;

    // Optional [0] EXPLICIT version.
    let (first, rest) = decoder::read_raw_value(cursor, &ParseOptions::default())?;
    let first = first.ok_or_else(|| Error::invalid_argument("empty TBSCertificate"))?;
    if first.tag_class == TagClass::ContextSpecific && first.tag_number == 0 {
        cursor = rest;
    }

    // Serial number: content bytes kept verbatim.
    let (serial, rest) = decoder::read_raw_value(cursor, &ParseOptions::with_tag(TAG_INTEGER))?;
    let (serial, rest) = expect(serial, rest, "serial")?;
    cert.serial = serial.content.to_vec();
    cursor = rest;

    // Inner signature algorithm: skipped, the envelope's copy is
    // authoritative.
    let (algorithm, rest) = decoder::read_algorithm_identifier(cursor, &ParseOptions::default())?;
    expect(algorithm, rest, "signature algorithm")?;
    cursor = rest;

    // Issuer: raw DER.
    let (issuer_raw, issuer, rest) = split_raw(cursor)?;
    if issuer.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad issuer name"));
    }
    cert.issuer = issuer_raw.to_vec();
    cursor = rest;

    // Validity.
    let (validity, rest) = decoder::read_raw_value(cursor, &ParseOptions::with_tag(TAG_SEQUENCE))?;
    let (validity, rest) = expect(validity, rest, "validity")?;
    let (not_before, not_after) = parse_validity(validity.content)?;
    cert.not_before = Some(not_before);
    cert.not_after = Some(not_after);
    cursor = rest;

    // Subject: raw DER.
    let (subject_raw, subject, rest) = split_raw(cursor)?;
    if subject.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad subject name"));
    }
    cert.subject = subject_raw.to_vec();
    cursor = rest;

    // SubjectPublicKeyInfo.
    let (spki, rest) = decoder::read_raw_value(cursor, &ParseOptions::with_tag(TAG_SEQUENCE))?;
    let (spki, rest) = expect(spki, rest, "subject public key")?;
    cert.public_key = Some(parse_spki(spki.content)?);
    cursor = rest;

    // Optional issuerUniqueID [1], subjectUniqueID [2], extensions [3].
    while !cursor.is_empty() {
        let (value, rest) = decoder::read_raw_value(cursor, &ParseOptions::default())?;
        let Some(value) = value else { break };

        if value.tag_class == TagClass::ContextSpecific && value.tag_number == 3 {
            parse_extensions(value.content, &mut cert)?;
        }

        cursor = rest;
    }

    Ok(cert)
}

/// Splits a certificate into its signed envelope without interpreting the
/// TBS content.
pub fn parse_signed(der: &[u8]) -> Result<SignedData> {
    let (_, outer, _) = split_raw(der)?;
    if outer.tag_number != TAG_SEQUENCE || !outer.constructed {
        return Err(Error::invalid_argument("bad certificate envelope"));
    }

    let (tbs_raw, tbs, rest) = split_raw(outer.content)?;
    if tbs.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad TBSCertificate"));
    }

    let (signature_algorithm, rest) =
        decoder::read_algorithm_identifier(rest, &ParseOptions::default())?;
    let signature_algorithm = signature_algorithm
        .ok_or_else(|| Error::invalid_argument("certificate without signature algorithm"))?;

    let (signature_bits, _) =
        decoder::read_raw_value(rest, &ParseOptions::with_tag(TAG_BIT_STRING))?;
    let signature_bits = signature_bits
        .ok_or_else(|| Error::invalid_argument("certificate without signature"))?;
    let signature = signature_bits
        .content
        .split_first()
        .map(|(_, sig)| sig.to_vec())
        .ok_or_else(|| Error::invalid_argument("empty signature"))?;

    Ok(SignedData {
        tbs_raw: tbs_raw.to_vec(),
        signature_algorithm,
        signature,
    })
}

fn parse_validity(content: &[u8]) -> Result<(SystemTime, SystemTime)> {
    let (not_before, rest) = decoder::read_raw_value(content, &ParseOptions::default())?;
    let not_before = not_before.ok_or_else(|| Error::invalid_argument("validity without start"))?;

    let (not_after, _) = decoder::read_raw_value(rest, &ParseOptions::default())?;
    let not_after = not_after.ok_or_else(|| Error::invalid_argument("validity without end"))?;

    for time in [&not_before, &not_after] {
        if time.tag_number != TAG_UTC_TIME && time.tag_number != TAG_GENERALIZED_TIME {
            return Err(Error::invalid_argument("bad validity time tag"));
        }
    }

    Ok((
        parse_asn1_time(not_before.tag_number, not_before.content)?,
        parse_asn1_time(not_after.tag_number, not_after.content)?,
    ))
}

fn parse_extensions(content: &[u8], cert: &mut Certificate) -> Result<()> {
    // extensions [3] wraps SEQUENCE OF Extension.
    let mut failure: Option<Error> = None;

    let (found, _) = decoder::read_sequence(content, &ParseOptions::default(), &mut |ext| {
        if let Err(err) = parse_extension(ext, cert) {
            failure = Some(err);
        }
        Ok(())
    })?;

    if found.is_none() {
        return Err(Error::invalid_argument("bad extensions encoding"));
    }
    if let Some(err) = failure {
        return Err(err);
    }

    Ok(())
}

fn parse_extension(ext: &Asn1Value<'_>, cert: &mut Certificate) -> Result<()> {
    // Extension ::= SEQUENCE { extnID, critical DEFAULT FALSE, extnValue }
    let (oid, rest) = decoder::read_oid(ext.content, &ParseOptions::default())?;
    let Some(oid) = oid else {
        return Err(Error::invalid_argument("extension without OID"));
    };

    // Skip the optional critical flag.
    let mut value_bytes = rest;
    let (maybe_bool, rest) = decoder::read_raw_value(value_bytes, &ParseOptions::default())?;
    if let Some(flag) = maybe_bool {
        if flag.tag_number == crate::asn1::TAG_BOOLEAN {
            value_bytes = rest;
        }
    }

    let (value, _) =
        decoder::read_octet_string(value_bytes, &ParseOptions::with_tag(TAG_OCTET_STRING))?;
    let Some(value) = value else {
        return Err(Error::invalid_argument("extension without value"));
    };

    match oid.as_str() {
        OID_SUBJECT_KEY_ID => cert.subject_key_id = parse_subject_key_id(&value)?,
        OID_AUTHORITY_KEY_ID => cert.authority_key_id = parse_authority_key_id(&value)?,
        OID_ISSUER_ALT_NAME => cert.issuer_urls = parse_issuer_alt_name(&value)?,
        _ => {}
    }

    Ok(())
}

fn parse_subject_key_id(value: &[u8]) -> Result<Vec<u8>> {
    // extnValue wraps OCTET STRING { keyIdentifier }. Some producers nest
    // a second OCTET STRING; unwrap it when it spans the whole value.
    let (inner, _) = decoder::read_octet_string(value, &ParseOptions::default())?;
    let inner = inner.ok_or_else(|| Error::invalid_argument("bad subject key id"))?;

    match decoder::read_octet_string(&inner, &ParseOptions::optional())? {
        (Some(nested), rest) if rest.is_empty() => Ok(nested),
        _ => Ok(inner),
    }
}

fn parse_authority_key_id(value: &[u8]) -> Result<Vec<u8>> {
    // AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] OPTIONAL, .. }
    let mut key_id = Vec::new();

    let (found, _) = decoder::read_sequence(value, &ParseOptions::default(), &mut |field| {
        if field.tag_class == TagClass::ContextSpecific && field.tag_number == 0 {
            key_id = field.content.to_vec();
        }
        Ok(())
    })?;

    if found.is_none() {
        return Err(Error::invalid_argument("bad authority key id"));
    }

    Ok(key_id)
}

fn parse_issuer_alt_name(value: &[u8]) -> Result<Vec<String>> {
    // GeneralNames ::= SEQUENCE OF GeneralName; URIs carry tag [6].
    let mut uris = Vec::new();
    let mut failure: Option<Error> = None;

    let (found, _) = decoder::read_sequence(value, &ParseOptions::default(), &mut |name| {
        if name.tag_class == TagClass::ContextSpecific && name.tag_number == 6 {
            match std::str::from_utf8(name.content) {
                Ok(uri) => uris.push(uri.to_string()),
                Err(_) => failure = Some(Error::invalid_argument("bad IssuerAltName URI")),
            }
        }
        Ok(())
    })?;

    if found.is_none() {
        return Err(Error::invalid_argument("bad IssuerAltName"));
    }
    if let Some(err) = failure {
        return Err(err);
    }

    Ok(uris)
}

/// Fields extracted from a certification request.
#[derive(Debug, Clone)]
pub struct CsrInfo {
    /// Raw DER of the subject name.
    pub subject_raw: Vec<u8>,
    /// Raw DER of the SubjectPublicKeyInfo, reused verbatim when issuing.
    pub spki_raw: Vec<u8>,
}

/// Parses a PKCS#10 certification request.
pub fn parse_csr(der: &[u8]) -> Result<CsrInfo> {
    let (_, outer, _) = split_raw(der)?;
    if outer.tag_number != TAG_SEQUENCE || !outer.constructed {
        return Err(Error::invalid_argument("bad CSR envelope"));
    }

    // CertificationRequestInfo.
    let (_, cri, _) = split_raw(outer.content)?;
    if cri.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad CertificationRequestInfo"));
    }

    // version INTEGER.
    let (version, rest) = decoder::read_integer(cri.content, &ParseOptions::default())?;
    if version.is_none() {
        return Err(Error::invalid_argument("CSR without version"));
    }

    // subject Name.
    let (subject_raw, subject, rest) = split_raw(rest)?;
    if subject.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad CSR subject"));
    }

    // SubjectPublicKeyInfo.
    let (spki_raw, spki, _) = split_raw(rest)?;
    if spki.tag_number != TAG_SEQUENCE {
        return Err(Error::invalid_argument("bad CSR public key"));
    }

    // Validate that the SPKI parses into a supported key.
    parse_spki(spki.content)?;

    Ok(CsrInfo {
        subject_raw: subject_raw.to_vec(),
        spki_raw: spki_raw.to_vec(),
    })
}

/// Parses every certificate in a PEM blob. The output count matches the
/// number of `BEGIN CERTIFICATE` markers.
pub fn pem_to_certificates(pem_blob: &str) -> Result<Vec<Certificate>> {
    let ders = pem::decode_labeled(pem_blob, pem::CERTIFICATE)?;
    if ders.is_empty() {
        return Err(Error::invalid_argument("no certificates in PEM input"));
    }

    ders.iter().map(|der| parse_certificate(der)).collect()
}
