// Path: crates/crypto/src/asn1/decoder.rs
//! Streaming DER decoder.
//!
//! All readers operate on a borrowed slice and return the decoded value
//! plus the remaining bytes. DER-only: indefinite lengths are rejected.

use crate::asn1::{oid, TAG_INTEGER, TAG_OCTET_STRING, TAG_OID, TAG_SEQUENCE, TAG_SET};
use crate::error::{Error, Result};
use aegis_api::crypto::{
    AlgorithmIdentifier, Asn1ElementHandler, Asn1Value, ParseOptions, ParseOutcome, TagClass,
};

/// Decoded identifier and length octets of one TLV element.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Tag class.
    pub tag_class: TagClass,
    /// Tag number, long-form tags folded in.
    pub tag_number: u32,
    /// Constructed bit.
    pub constructed: bool,
    /// Content length in bytes.
    pub length: usize,
    /// Number of identifier + length octets.
    pub header_len: usize,
}

const LONG_TAG: u8 = 0x1f;

/// Parses the identifier and length octets at the start of `data`.
pub fn read_header(data: &[u8]) -> Result<Header> {
    let (&first, mut rest) = data
        .split_first()
        .ok_or_else(|| Error::failed("truncated ASN.1 header"))?;

    let tag_class = match first >> 6 {
        0 => TagClass::Universal,
        1 => TagClass::Application,
        2 => TagClass::ContextSpecific,
        _ => TagClass::Private,
    };
    let constructed = first & 0x20 != 0;

    let mut tag_number = u32::from(first & LONG_TAG);
    if tag_number == u32::from(LONG_TAG) {
        // Long-form tag: base-128 digits, MSB set on all but the last.
        tag_number = 0;
        loop {
            let (&byte, tail) = rest
                .split_first()
                .ok_or_else(|| Error::failed("truncated long-form tag"))?;
            rest = tail;

            tag_number = tag_number
                .checked_shl(7)
                .ok_or_else(|| Error::failed("ASN.1 tag number overflow"))?
                | u32::from(byte & 0x7f);

            if byte & 0x80 == 0 {
                break;
            }
        }
    }

    let (&len_byte, mut rest) = rest
        .split_first()
        .ok_or_else(|| Error::failed("truncated ASN.1 length"))?;

    let length = if len_byte < 0x80 {
        usize::from(len_byte)
    } else {
        let count = usize::from(len_byte & 0x7f);
        if count == 0 {
            return Err(Error::failed("indefinite ASN.1 length is not DER"));
        }
        if count > std::mem::size_of::<usize>() {
            return Err(Error::failed("ASN.1 length overflow"));
        }

        let mut length = 0usize;
        for _ in 0..count {
            let (&byte, tail) = rest
                .split_first()
                .ok_or_else(|| Error::failed("truncated long-form length"))?;
            rest = tail;
            length = (length << 8) | usize::from(byte);
        }
        length
    };

    let header_len = data.len() - rest.len();
    if rest.len() < length {
        return Err(Error::failed("insufficient data size for ASN.1 content"));
    }

    Ok(Header {
        tag_class,
        tag_number,
        constructed,
        length,
        header_len,
    })
}

/// Splits `data` into the content of its first element and the bytes after
/// that element.
fn split_element<'a>(data: &'a [u8], header: &Header) -> Result<(&'a [u8], &'a [u8])> {
    let after_header = data
        .get(header.header_len..)
        .ok_or_else(|| Error::failed("insufficient data size for ASN.1 content"))?;
    let content = after_header
        .get(..header.length)
        .ok_or_else(|| Error::failed("insufficient data size for ASN.1 content"))?;
    let remaining = after_header
        .get(header.length..)
        .ok_or_else(|| Error::failed("insufficient data size for ASN.1 content"))?;

    Ok((content, remaining))
}

/// Checks the header against the parse options: an explicit tag override
/// matches on tag number alone; otherwise the element must be universal
/// with the reader's default tag.
fn tag_matches(header: &Header, opt: &ParseOptions, default_tag: u32) -> bool {
    match opt.tag {
        Some(tag) => header.tag_number == tag,
        None => header.tag_class == TagClass::Universal && header.tag_number == default_tag,
    }
}

/// Reports an optional miss by echoing the input, or fails.
fn miss<'a, T>(data: &'a [u8], opt: &ParseOptions, what: &str) -> ParseOutcome<'a, T> {
    if opt.optional {
        Ok((None, data))
    } else {
        Err(Error::failed(what))
    }
}

fn to_value<'a>(header: &Header, content: &'a [u8]) -> Asn1Value<'a> {
    Asn1Value {
        tag_class: header.tag_class,
        tag_number: header.tag_number,
        constructed: header.constructed,
        content,
    }
}

/// Consumes one TLV header and hands the complete content to `on_element`.
///
/// Without an explicit tag override the element must be a constructed
/// universal SEQUENCE or SET.
pub fn read_struct<'a>(
    data: &'a [u8],
    opt: &ParseOptions,
    on_element: &mut Asn1ElementHandler<'_>,
) -> ParseOutcome<'a, ()> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(err) => return if opt.optional { Ok((None, data)) } else { Err(err) },
    };

    let matched = match opt.tag {
        Some(tag) => header.tag_number == tag,
        None => {
            header.tag_class == TagClass::Universal
                && (header.tag_number == TAG_SEQUENCE || header.tag_number == TAG_SET)
        }
    };
    if !matched {
        return miss(data, opt, "bad tag for struct");
    }
    if !header.constructed {
        return Err(Error::failed("expected constructed ASN.1 element"));
    }

    let (content, remaining) = split_element(data, &header)?;
    on_element(&to_value(&header, content))?;

    Ok((Some(()), remaining))
}

fn read_container<'a>(
    data: &'a [u8],
    opt: &ParseOptions,
    on_element: &mut Asn1ElementHandler<'_>,
    expected_tag: u32,
) -> ParseOutcome<'a, ()> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(err) => return if opt.optional { Ok((None, data)) } else { Err(err) },
    };

    if !tag_matches(&header, opt, expected_tag) {
        return miss(data, opt, "bad tag for container");
    }
    if !header.constructed {
        return Err(Error::failed("expected constructed ASN.1 element"));
    }

    let (content, remaining) = split_element(data, &header)?;

    // Iterate the elements inside the container.
    let mut cursor = content;
    while !cursor.is_empty() {
        let elem = read_header(cursor).map_err(|_| Error::failed("failed to parse element"))?;
        let (elem_content, rest) = split_element(cursor, &elem)?;

        on_element(&to_value(&elem, elem_content))?;

        cursor = rest;
    }

    Ok((Some(()), remaining))
}

/// Reads a SEQUENCE and invokes `on_element` once per inner element.
pub fn read_sequence<'a>(
    data: &'a [u8],
    opt: &ParseOptions,
    on_element: &mut Asn1ElementHandler<'_>,
) -> ParseOutcome<'a, ()> {
    read_container(data, opt, on_element, TAG_SEQUENCE)
}

/// Reads a SET and invokes `on_element` once per inner element.
pub fn read_set<'a>(
    data: &'a [u8],
    opt: &ParseOptions,
    on_element: &mut Asn1ElementHandler<'_>,
) -> ParseOutcome<'a, ()> {
    read_container(data, opt, on_element, TAG_SET)
}

/// Reads an INTEGER into a host integer. Values must be non-negative and
/// fit into 64 bits.
pub fn read_integer<'a>(data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, i64> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(_) => return miss(data, opt, "failed to parse INTEGER"),
    };
    if !tag_matches(&header, opt, TAG_INTEGER) {
        return miss(data, opt, "failed to parse INTEGER");
    }

    let (content, remaining) = split_element(data, &header)?;
    if content.is_empty() {
        return Err(Error::failed("empty INTEGER"));
    }
    if content.first().is_some_and(|first| first & 0x80 != 0) {
        return Err(Error::failed("negative INTEGER not supported"));
    }

    let mut bytes = content;
    while bytes.len() > 1 && bytes.first() == Some(&0) {
        bytes = bytes.get(1..).unwrap_or(&[]);
    }
    if bytes.len() > 8 {
        return Err(Error::failed("INTEGER too large"));
    }

    let mut value = 0u64;
    for &byte in bytes {
        value = (value << 8) | u64::from(byte);
    }
    let value = i64::try_from(value).map_err(|_| Error::failed("INTEGER too large"))?;

    Ok((Some(value), remaining))
}

/// Reads an INTEGER of arbitrary size as big-endian bytes with leading
/// zeros stripped, matching a bignum export.
pub fn read_big_integer<'a>(data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, Vec<u8>> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(_) => return miss(data, opt, "failed to parse BIG INTEGER"),
    };
    if !tag_matches(&header, opt, TAG_INTEGER) {
        return miss(data, opt, "failed to parse BIG INTEGER");
    }

    let (content, remaining) = split_element(data, &header)?;

    let mut bytes = content;
    while bytes.first() == Some(&0) {
        bytes = bytes.get(1..).unwrap_or(&[]);
    }

    Ok((Some(bytes.to_vec()), remaining))
}

/// Reads an OBJECT IDENTIFIER and converts it to dotted-decimal text.
pub fn read_oid<'a>(data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, String> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(_) => return miss(data, opt, "failed to parse OID"),
    };
    if !tag_matches(&header, opt, TAG_OID) {
        return miss(data, opt, "failed to parse OID");
    }

    let (content, remaining) = split_element(data, &header)?;
    let text = oid::content_to_text(content)
        .map_err(|_| Error::failed("failed to convert OID to string"))?;

    Ok((Some(text), remaining))
}

/// Reads an `AlgorithmIdentifier`: SEQUENCE of an OID and optional ANY
/// parameters. Parameters are returned raw, preserving their tag.
pub fn read_algorithm_identifier<'a>(
    data: &'a [u8],
    opt: &ParseOptions,
) -> ParseOutcome<'a, AlgorithmIdentifier> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(_) => return miss(data, opt, "failed to parse AlgorithmIdentifier"),
    };
    if !tag_matches(&header, opt, TAG_SEQUENCE) || !header.constructed {
        return miss(data, opt, "failed to parse AlgorithmIdentifier");
    }

    let (content, remaining) = split_element(data, &header)?;

    let (oid_text, after_oid) = match read_oid(content, &ParseOptions::default())? {
        (Some(oid_text), rest) => (oid_text, rest),
        (None, _) => return Err(Error::failed("AlgorithmIdentifier without OID")),
    };

    let params = if after_oid.is_empty() {
        None
    } else {
        let (value, rest) = match read_raw_value(after_oid, &ParseOptions::default())? {
            (Some(value), rest) => (value, rest),
            (None, _) => return Err(Error::failed("AID params parsing error")),
        };
        if !rest.is_empty() {
            return Err(Error::invalid_argument("AID params parsing error"));
        }
        Some((&value).into())
    };

    Ok((
        Some(AlgorithmIdentifier {
            oid: oid_text,
            params,
        }),
        remaining,
    ))
}

/// Reads an OCTET STRING, copying the content verbatim.
pub fn read_octet_string<'a>(data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, Vec<u8>> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(_) => return miss(data, opt, "failed to parse OCTET STRING"),
    };
    if !tag_matches(&header, opt, TAG_OCTET_STRING) {
        return miss(data, opt, "failed to parse OCTET STRING");
    }

    let (content, remaining) = split_element(data, &header)?;

    Ok((Some(content.to_vec()), remaining))
}

/// Reads one element without decoding: header metadata plus a borrowed
/// content slice.
pub fn read_raw_value<'a>(data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, Asn1Value<'a>> {
    if opt.optional && data.is_empty() {
        return Ok((None, data));
    }

    let header = match read_header(data) {
        Ok(header) => header,
        Err(err) => return if opt.optional { Ok((None, data)) } else { Err(err) },
    };

    if let Some(tag) = opt.tag {
        if header.tag_number != tag {
            return miss(data, opt, "tag doesn't match");
        }
    }

    let (content, remaining) = split_element(data, &header)?;

    Ok((Some(to_value(&header, content)), remaining))
}
