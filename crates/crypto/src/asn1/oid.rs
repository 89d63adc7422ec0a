// Path: crates/crypto/src/asn1/oid.rs
//! OBJECT IDENTIFIER conversion between dotted-decimal text and DER
//! content bytes.

use crate::error::{Error, Result};

/// Converts dotted-decimal text (`"1.2.840.113549.1.1.11"`) to DER OID
/// content bytes.
pub fn text_to_content(text: &str) -> Result<Vec<u8>> {
    let mut arcs = text.split('.').map(|part| {
        part.parse::<u64>()
            .map_err(|_| Error::invalid_argument(format!("bad OID {text}")))
    });

    let first = arcs
        .next()
        .transpose()?
        .ok_or_else(|| Error::invalid_argument(format!("bad OID {text}")))?;
    let second = arcs
        .next()
        .transpose()?
        .ok_or_else(|| Error::invalid_argument(format!("bad OID {text}")))?;

    if first > 2 || (first < 2 && second > 39) {
        return Err(Error::invalid_argument(format!("bad OID {text}")));
    }

    let mut content = Vec::new();
    push_base128(&mut content, first * 40 + second);

    for arc in arcs {
        push_base128(&mut content, arc?);
    }

    Ok(content)
}

/// Converts DER OID content bytes to dotted-decimal text.
pub fn content_to_text(content: &[u8]) -> Result<String> {
    if content.is_empty() {
        return Err(Error::invalid_argument("empty OID"));
    }

    let mut arcs = Vec::new();
    let mut value: u64 = 0;

    for &byte in content {
        value = value
            .checked_shl(7)
            .ok_or_else(|| Error::invalid_argument("OID arc overflow"))?
            | u64::from(byte & 0x7f);

        if byte & 0x80 == 0 {
            arcs.push(value);
            value = 0;
        }
    }

    if content.last().is_some_and(|last| last & 0x80 != 0) {
        return Err(Error::invalid_argument("truncated OID arc"));
    }

    let first_arc = arcs
        .first()
        .copied()
        .ok_or_else(|| Error::invalid_argument("empty OID"))?;

    // The first content value folds the first two arcs together.
    let (first, second) = if first_arc < 40 {
        (0, first_arc)
    } else if first_arc < 80 {
        (1, first_arc - 40)
    } else {
        (2, first_arc - 80)
    };

    let mut text = format!("{first}.{second}");
    for arc in arcs.iter().skip(1) {
        text.push('.');
        text.push_str(&arc.to_string());
    }

    Ok(text)
}

fn push_base128(out: &mut Vec<u8>, value: u64) {
    let mut digits = [0u8; 10];
    let mut count = 0;
    let mut rest = value;

    loop {
        if let Some(slot) = digits.get_mut(count) {
            *slot = (rest & 0x7f) as u8;
        }
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }

    for index in (0..count).rev() {
        let Some(&digit) = digits.get(index) else {
            continue;
        };
        if index == 0 {
            out.push(digit);
        } else {
            out.push(digit | 0x80);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_round_trip() {
        for text in [
            "1.2.840.113549.1.1.11",
            "2.5.4.3",
            "2.5.29.37",
            "1.3.132.0.34",
            "0.9.2342.19200300.100.1.25",
        ] {
            let content = text_to_content(text).unwrap();
            assert_eq!(content_to_text(&content).unwrap(), text);
        }
    }

    #[test]
    fn test_known_encoding() {
        // id-ecPublicKey 1.2.840.10045.2.1
        let content = text_to_content("1.2.840.10045.2.1").unwrap();
        assert_eq!(content, vec![0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01]);
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(text_to_content("").is_err());
        assert!(text_to_content("1").is_err());
        assert!(text_to_content("1.40").is_err());
        assert!(text_to_content("3.1").is_err());
        assert!(text_to_content("1.2.x").is_err());
    }

    #[test]
    fn test_rejects_truncated_content() {
        // Continuation bit set on the final byte.
        assert!(content_to_text(&[0x2a, 0x86]).is_err());
        assert!(content_to_text(&[]).is_err());
    }
}
