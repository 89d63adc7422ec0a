// Path: crates/crypto/src/asn1/dn.rs
//! X.501 distinguished-name text codec.
//!
//! `encode` accepts both `", "`-separated and legacy `"/"`-separated
//! attribute lists; `decode` always renders the canonical `"K=V, K=V"`
//! form so the two provider back-ends produce identical strings.

use crate::asn1::{decoder, writer, TAG_UTF8_STRING};
use crate::asn1::{TAG_IA5_STRING, TAG_PRINTABLE_STRING};
use crate::error::{Error, Result};
use aegis_api::crypto::{ParseOptions, TagClass};

/// Attribute short names recognized in DN text, with their type OIDs.
const DN_ATTRIBUTES: &[(&str, &str)] = &[
    ("CN", "2.5.4.3"),
    ("SN", "2.5.4.5"),
    ("C", "2.5.4.6"),
    ("L", "2.5.4.7"),
    ("ST", "2.5.4.8"),
    ("O", "2.5.4.10"),
    ("OU", "2.5.4.11"),
    ("emailAddress", "1.2.840.113549.1.9.1"),
];

fn attribute_oid(name: &str) -> Result<&'static str> {
    DN_ATTRIBUTES
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(name))
        .map(|(_, oid_text)| *oid_text)
        .ok_or_else(|| Error::invalid_argument(format!("unknown DN attribute {name}")))
}

fn attribute_name(oid_text: &str) -> Option<&'static str> {
    DN_ATTRIBUTES
        .iter()
        .find(|(_, known)| *known == oid_text)
        .map(|(short, _)| *short)
}

/// Builds a DER `Name` from text like `"CN=Aos Core, C=UA"`.
///
/// Entries split on `,` and `/`; each left-hand token must be a known
/// attribute short name and the right-hand side is stored as a
/// UTF8String.
pub fn encode(text: &str) -> Result<Vec<u8>> {
    let mut rdns: Vec<Vec<u8>> = Vec::new();

    for entry in text.split(|ch| ch == ',' || ch == '/') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| Error::invalid_argument(format!("bad DN entry {entry}")))?;

        let key = key.trim();
        let value = value.trim();

        let type_oid = writer::encode_oid_text(attribute_oid(key)?)?;
        let atv = writer::encode_sequence(&[
            type_oid.as_slice(),
            writer::encode_utf8_string(value).as_slice(),
        ]);
        rdns.push(writer::encode_set(&[atv.as_slice()]));
    }

    let rdn_refs: Vec<&[u8]> = rdns.iter().map(|rdn| rdn.as_slice()).collect();

    Ok(writer::encode_sequence(&rdn_refs))
}

/// Renders a DER `Name` as canonical `"K=V, K=V"` text.
pub fn decode(der: &[u8]) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut inner_err: Option<Error> = None;

    let (found, _) = decoder::read_sequence(der, &ParseOptions::default(), &mut |rdn| {
        // Each element is one RDN: SET OF AttributeTypeAndValue. The SET
        // content arrives here; parse the single ATV inside.
        match decode_atv(rdn.content) {
            Ok(part) => parts.push(part),
            Err(err) => inner_err = Some(err),
        }
        Ok(())
    })?;

    if let Some(err) = inner_err {
        return Err(err);
    }
    if found.is_none() {
        return Err(Error::invalid_argument("bad DN encoding"));
    }

    Ok(parts.join(", "))
}

fn decode_atv(set_content: &[u8]) -> Result<String> {
    let (atv, _) = decoder::read_raw_value(set_content, &ParseOptions::default())?;
    let atv = atv.ok_or_else(|| Error::invalid_argument("bad DN attribute"))?;

    if atv.tag_class != TagClass::Universal || !atv.constructed {
        return Err(Error::invalid_argument("bad DN attribute"));
    }

    let (type_oid, rest) = decoder::read_oid(atv.content, &ParseOptions::default())?;
    let type_oid = type_oid.ok_or_else(|| Error::invalid_argument("bad DN attribute"))?;

    let (value, _) = decoder::read_raw_value(rest, &ParseOptions::default())?;
    let value = value.ok_or_else(|| Error::invalid_argument("bad DN attribute"))?;

    match value.tag_number {
        TAG_UTF8_STRING | TAG_PRINTABLE_STRING | TAG_IA5_STRING => {}
        other => {
            return Err(Error::invalid_argument(format!(
                "unsupported DN value tag {other}"
            )))
        }
    }

    let text = std::str::from_utf8(value.content)
        .map_err(|_| Error::invalid_argument("DN value is not valid UTF-8"))?;

    let name = match attribute_name(&type_oid) {
        Some(name) => name.to_string(),
        // Unknown attribute types render by dotted OID, as verifier
        // output does.
        None => type_oid,
    };

    Ok(format!("{name}={text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dn_round_trip() {
        let der = encode("CN=Aos Core, C=UA").unwrap();
        assert_eq!(decode(&der).unwrap(), "CN=Aos Core, C=UA");
    }

    #[test]
    fn test_dn_slash_separator_normalized() {
        let comma = encode("CN=unit, O=Edge, C=UA").unwrap();
        let slash = encode("CN=unit/O=Edge/C=UA").unwrap();
        assert_eq!(comma, slash);
        assert_eq!(decode(&slash).unwrap(), "CN=unit, O=Edge, C=UA");
    }

    #[test]
    fn test_dn_unknown_attribute_rejected() {
        assert!(encode("XX=nope").is_err());
        assert!(encode("CN").is_err());
    }

    #[test]
    fn test_dn_whitespace_trimmed() {
        let der = encode("  CN = spaced ,  C = UA ").unwrap();
        assert_eq!(decode(&der).unwrap(), "CN=spaced, C=UA");
    }
}
