// Path: crates/crypto/src/x509/verify.rs
//! Signature and certificate chain verification.

use crate::asn1::decoder;
use crate::error::{Error, Result};
use crate::hash;
use crate::keyreg;
use crate::x509::parser::{self, SignedData};
use crate::x509::{
    OID_ECDSA_WITH_SHA1, OID_ECDSA_WITH_SHA224, OID_ECDSA_WITH_SHA256, OID_ECDSA_WITH_SHA384,
    OID_ECDSA_WITH_SHA512, OID_SHA1_WITH_RSA, OID_SHA224_WITH_RSA, OID_SHA256_WITH_RSA,
    OID_SHA384_WITH_RSA, OID_SHA512_WITH_RSA,
};
use aegis_api::crypto::ParseOptions;
use aegis_types::crypto::{Certificate, HashAlgorithm, Padding, PublicKey, VerifyOptions};
use ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPublicKey};
use std::time::SystemTime;

const OID_SECP256R1: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
const OID_SECP384R1: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x22];

/// Maximum certificate chain depth accepted by the path builder.
const MAX_CHAIN_DEPTH: usize = 8;

fn rsa_public_key(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
    )
    .map_err(|err| Error::invalid_argument(format!("bad RSA public key: {err}")))
}

fn verify_rsa(
    modulus: &[u8],
    exponent: &[u8],
    hash_alg: HashAlgorithm,
    padding: Padding,
    digest: &[u8],
    signature: &[u8],
) -> Result<()> {
    let key = rsa_public_key(modulus, exponent)?;

    macro_rules! verify_with {
        ($digest_type:ty) => {
            match padding {
                Padding::Pkcs1v15 => key.verify(Pkcs1v15Sign::new::<$digest_type>(), digest, signature),
                Padding::Pss => key.verify(Pss::new::<$digest_type>(), digest, signature),
                Padding::None => {
                    return Err(Error::invalid_argument("RSA verification requires padding"))
                }
            }
        };
    }

    let outcome = match hash_alg {
        HashAlgorithm::Sha1 => verify_with!(sha1::Sha1),
        HashAlgorithm::Sha224 => verify_with!(sha2::Sha224),
        HashAlgorithm::Sha256 => verify_with!(sha2::Sha256),
        HashAlgorithm::Sha384 => verify_with!(sha2::Sha384),
        HashAlgorithm::Sha512 => verify_with!(sha2::Sha512),
        HashAlgorithm::Sha512_224 => verify_with!(sha2::Sha512_224),
        HashAlgorithm::Sha512_256 => verify_with!(sha2::Sha512_256),
        HashAlgorithm::Sha3_224 => verify_with!(sha3::Sha3_224),
        HashAlgorithm::Sha3_256 => verify_with!(sha3::Sha3_256),
    };

    outcome.map_err(|_| Error::failed("RSA signature verification failed"))
}

fn verify_ecdsa(curve_oid: &[u8], point: &[u8], digest: &[u8], signature: &[u8]) -> Result<()> {
    if digest.is_empty() || signature.is_empty() {
        return Err(Error::invalid_argument("empty digest or signature"));
    }

    if curve_oid == OID_SECP256R1 {
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
            .map_err(|err| Error::invalid_argument(format!("bad P-256 public key: {err}")))?;
        let signature = p256::ecdsa::Signature::from_slice(signature)
            .map_err(|err| Error::invalid_argument(format!("bad ECDSA signature: {err}")))?;

        key.verify_prehash(digest, &signature)
            .map_err(|_| Error::failed("ECDSA verification failed"))
    } else if curve_oid == OID_SECP384R1 {
        let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
            .map_err(|err| Error::invalid_argument(format!("bad P-384 public key: {err}")))?;
        let signature = p384::ecdsa::Signature::from_slice(signature)
            .map_err(|err| Error::invalid_argument(format!("bad ECDSA signature: {err}")))?;

        key.verify_prehash(digest, &signature)
            .map_err(|_| Error::failed("ECDSA verification failed"))
    } else {
        Err(Error::not_supported("EC curve"))
    }
}

/// Verifies a signature over a pre-hashed digest.
///
/// RSA accepts PKCS#1 v1.5 or PSS padding; ECDSA requires `Padding::None`
/// and a raw `r ‖ s` signature.
pub fn verify_signature(
    public_key: &PublicKey,
    hash_alg: HashAlgorithm,
    padding: Padding,
    digest: &[u8],
    signature: &[u8],
) -> Result<()> {
    if digest.is_empty() || signature.is_empty() {
        return Err(Error::invalid_argument("empty digest or signature"));
    }

    match public_key {
        PublicKey::Rsa { modulus, exponent } => {
            verify_rsa(modulus, exponent, hash_alg, padding, digest, signature)
        }
        PublicKey::Ecdsa { curve_oid, point } => {
            if padding != Padding::None {
                return Err(Error::invalid_argument(
                    "ECDSA verification does not take padding",
                ));
            }

            verify_ecdsa(curve_oid, point, digest, signature)
        }
    }
}

fn signature_scheme(oid: &str) -> Result<(HashAlgorithm, bool)> {
    // (digest, is_rsa)
    match oid {
        OID_SHA1_WITH_RSA => Ok((HashAlgorithm::Sha1, true)),
        OID_SHA224_WITH_RSA => Ok((HashAlgorithm::Sha224, true)),
        OID_SHA256_WITH_RSA => Ok((HashAlgorithm::Sha256, true)),
        OID_SHA384_WITH_RSA => Ok((HashAlgorithm::Sha384, true)),
        OID_SHA512_WITH_RSA => Ok((HashAlgorithm::Sha512, true)),
        OID_ECDSA_WITH_SHA1 => Ok((HashAlgorithm::Sha1, false)),
        OID_ECDSA_WITH_SHA224 => Ok((HashAlgorithm::Sha224, false)),
        OID_ECDSA_WITH_SHA256 => Ok((HashAlgorithm::Sha256, false)),
        OID_ECDSA_WITH_SHA384 => Ok((HashAlgorithm::Sha384, false)),
        OID_ECDSA_WITH_SHA512 => Ok((HashAlgorithm::Sha512, false)),
        other => Err(Error::not_supported(format!("signature algorithm {other}"))),
    }
}

/// Converts a DER `ECDSA-Sig-Value` into the fixed-width `r ‖ s` form the
/// curve verifier takes.
fn ecdsa_der_to_raw(der: &[u8], curve_oid: &[u8]) -> Result<Vec<u8>> {
    let bits = keyreg::curve_bits(curve_oid)?;
    let width = bits.div_ceil(8);

    let (seq, _) = decoder::read_raw_value(
        der,
        &ParseOptions::with_tag(crate::asn1::TAG_SEQUENCE),
    )?;
    let seq = seq.ok_or_else(|| Error::failed("bad ECDSA signature encoding"))?;

    let (r, rest) = decoder::read_big_integer(seq.content, &ParseOptions::default())?;
    let r = r.ok_or_else(|| Error::failed("bad ECDSA signature encoding"))?;
    let (s, _) = decoder::read_big_integer(rest, &ParseOptions::default())?;
    let s = s.ok_or_else(|| Error::failed("bad ECDSA signature encoding"))?;

    if r.len() > width || s.len() > width {
        return Err(Error::failed("ECDSA signature component too long"));
    }

    let mut raw = vec![0u8; width * 2];
    let (r_slot, s_slot) = raw.split_at_mut(width);
    if let Some(slot) = r_slot.get_mut(width - r.len()..) {
        slot.copy_from_slice(&r);
    }
    if let Some(slot) = s_slot.get_mut(width - s.len()..) {
        slot.copy_from_slice(&s);
    }

    Ok(raw)
}

/// Verifies that `signed` was produced by the holder of `issuer_key`.
fn verify_issued(signed: &SignedData, issuer_key: &PublicKey) -> Result<()> {
    let (hash_alg, is_rsa) = signature_scheme(&signed.signature_algorithm.oid)?;
    let digest = hash::digest(hash_alg, &signed.tbs_raw);

    match issuer_key {
        PublicKey::Rsa { modulus, exponent } => {
            if !is_rsa {
                return Err(Error::failed("signature algorithm does not match issuer key"));
            }

            verify_rsa(
                modulus,
                exponent,
                hash_alg,
                Padding::Pkcs1v15,
                &digest,
                &signed.signature,
            )
        }
        PublicKey::Ecdsa { curve_oid, point } => {
            if is_rsa {
                return Err(Error::failed("signature algorithm does not match issuer key"));
            }

            let raw = ecdsa_der_to_raw(&signed.signature, curve_oid)?;
            verify_ecdsa(curve_oid, point, &digest, &raw)
        }
    }
}

fn check_validity(certificate: &Certificate, now: SystemTime) -> Result<()> {
    if let Some(not_before) = certificate.not_before {
        if now < not_before {
            return Err(Error::failed("The certificate validity starts in the future"));
        }
    }

    if let Some(not_after) = certificate.not_after {
        if now > not_after {
            return Err(Error::failed("The certificate validity has expired"));
        }
    }

    Ok(())
}

fn find_issuer<'a>(
    certificate: &Certificate,
    roots: &'a [Certificate],
    intermediates: &'a [Certificate],
) -> Option<(&'a Certificate, bool)> {
    // Trust anchors take precedence over intermediates.
    if let Some(root) = roots
        .iter()
        .find(|candidate| candidate.subject == certificate.issuer)
    {
        return Some((root, true));
    }

    intermediates
        .iter()
        .find(|candidate| candidate.subject == certificate.issuer)
        .map(|candidate| (candidate, false))
}

/// Verifies `certificate` against the trust store built from `roots`,
/// using `intermediates` to complete the path. With a check time in
/// `options` the validity windows are evaluated at that instant instead
/// of now.
pub fn verify_certificate(
    roots: &[Certificate],
    intermediates: &[Certificate],
    options: &VerifyOptions,
    certificate: &Certificate,
) -> Result<()> {
    let use_check_time = options.current_time.is_some();
    let now = options.current_time.unwrap_or_else(SystemTime::now);

    if use_check_time {
        log::debug!("verify certificate with fixed check time");
    }

    let mut current = certificate.clone();

    for _depth in 0..MAX_CHAIN_DEPTH {
        check_validity(&current, now)?;

        let signed = parser::parse_signed(&current.raw)?;

        // Self-issued certificate: trusted iff it is one of the roots.
        if current.subject == current.issuer {
            let anchored = roots.iter().any(|root| root.raw == current.raw);
            if !anchored {
                return Err(Error::failed(
                    "The certificate is not correctly signed by the trusted CA",
                ));
            }

            let key = current
                .public_key
                .as_ref()
                .ok_or_else(|| Error::failed("certificate without public key"))?;

            return verify_issued(&signed, key);
        }

        let Some((issuer, is_root)) = find_issuer(&current, roots, intermediates) else {
            return Err(Error::failed("Unable to find issuer certificate"));
        };

        let issuer_key = issuer
            .public_key
            .as_ref()
            .ok_or_else(|| Error::failed("issuer certificate without public key"))?;

        verify_issued(&signed, issuer_key)?;

        if is_root {
            return check_validity(issuer, now);
        }

        current = issuer.clone();
    }

    Err(Error::failed("certificate chain too deep"))
}
