// Path: crates/crypto/src/pem.rs
//! PEM framing per RFC 7468.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Label of a certificate block.
pub const CERTIFICATE: &str = "CERTIFICATE";
/// Label of a PKCS#10 certification request block.
pub const CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";

const LINE_WIDTH: usize = 64;

/// One decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    /// Block label, e.g. `CERTIFICATE`.
    pub label: String,
    /// Decoded DER content.
    pub der: Vec<u8>,
}

/// Encodes DER content under the given label with 64-column body lines.
pub fn encode(label: &str, der: &[u8]) -> String {
    let body = BASE64.encode(der);

    let mut out = String::with_capacity(body.len() + body.len() / LINE_WIDTH + 64);
    out.push_str("-----BEGIN ");
    out.push_str(label);
    out.push_str("-----\n");

    let mut rest = body.as_str();
    while !rest.is_empty() {
        let take = rest.len().min(LINE_WIDTH);
        let (line, tail) = rest.split_at(take);
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }

    out.push_str("-----END ");
    out.push_str(label);
    out.push_str("-----\n");

    out
}

/// Decodes every block in a PEM blob, in input order.
pub fn decode_all(pem: &str) -> Result<Vec<PemBlock>> {
    let mut blocks = Vec::new();
    let mut label: Option<String> = None;
    let mut body = String::new();

    for line in pem.lines() {
        let line = line.trim();

        if let Some(begin) = line
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
        {
            if label.is_some() {
                return Err(Error::invalid_argument("nested PEM block"));
            }
            label = Some(begin.to_string());
            body.clear();
            continue;
        }

        if let Some(end) = line
            .strip_prefix("-----END ")
            .and_then(|rest| rest.strip_suffix("-----"))
        {
            let open = label
                .take()
                .ok_or_else(|| Error::invalid_argument("END without BEGIN"))?;
            if open != end {
                return Err(Error::invalid_argument("mismatched PEM labels"));
            }

            let der = BASE64
                .decode(body.as_bytes())
                .map_err(|err| Error::invalid_argument(format!("bad PEM base64: {err}")))?;
            blocks.push(PemBlock { label: open, der });
            body.clear();
            continue;
        }

        if label.is_some() {
            body.push_str(line);
        }
    }

    if label.is_some() {
        return Err(Error::invalid_argument("unterminated PEM block"));
    }

    Ok(blocks)
}

/// Decodes every block carrying the given label.
pub fn decode_labeled(pem: &str, label: &str) -> Result<Vec<Vec<u8>>> {
    Ok(decode_all(pem)?
        .into_iter()
        .filter(|block| block.label == label)
        .map(|block| block.der)
        .collect())
}

/// Decodes the first block carrying the given label.
pub fn decode_first(pem: &str, label: &str) -> Result<Vec<u8>> {
    decode_labeled(pem, label)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_argument(format!("no {label} block in PEM input")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let der: Vec<u8> = (0u8..=255).collect();
        let pem = encode(CERTIFICATE, &der);

        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        assert!(pem.lines().all(|line| line.len() <= 64 + 11));

        let blocks = decode_all(&pem).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, CERTIFICATE);
        assert_eq!(blocks[0].der, der);
    }

    #[test]
    fn test_decode_multiple_blocks_preserves_order() {
        let mut pem = encode(CERTIFICATE, b"first");
        pem.push_str(&encode(CERTIFICATE_REQUEST, b"second"));
        pem.push_str(&encode(CERTIFICATE, b"third"));

        let blocks = decode_all(&pem).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].der, b"first");
        assert_eq!(blocks[2].der, b"third");

        let certs = decode_labeled(&pem, CERTIFICATE).unwrap();
        assert_eq!(certs, vec![b"first".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn test_decode_rejects_malformed_framing() {
        assert!(decode_all("-----BEGIN CERTIFICATE-----\nAAAA\n").is_err());
        assert!(decode_all("-----END CERTIFICATE-----\n").is_err());

        let mismatched = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END PRIVATE KEY-----\n";
        assert!(decode_all(mismatched).is_err());
    }

    #[test]
    fn test_decode_first_missing_label() {
        let pem = encode(CERTIFICATE, b"x");
        assert!(decode_first(&pem, "PRIVATE KEY").is_err());
    }
}
