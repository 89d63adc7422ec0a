// Path: crates/types/src/crypto.rs
//! Value types shared by the crypto provider back-ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Hash algorithms supported by the provider surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (legacy, kept for key-id derivation and small-key bands).
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// SHA-512/224 truncated variant.
    Sha512_224,
    /// SHA-512/256 truncated variant.
    Sha512_256,
    /// SHA3-224.
    Sha3_224,
    /// SHA3-256.
    Sha3_256,
}

impl HashAlgorithm {
    /// Returns the digest length in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha512_256 | Self::Sha3_256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the canonical algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
            Self::Sha512_224 => "SHA512-224",
            Self::Sha512_256 => "SHA512-256",
            Self::Sha3_224 => "SHA3-224",
            Self::Sha3_256 => "SHA3-256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = crate::error::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "SHA1" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            "SHA512-224" => Ok(Self::Sha512_224),
            "SHA512-256" => Ok(Self::Sha512_256),
            "SHA3-224" => Ok(Self::Sha3_224),
            "SHA3-256" => Ok(Self::Sha3_256),
            other => Err(crate::error::Error::not_supported(format!(
                "hash algorithm {other}"
            ))),
        }
    }
}

/// Signature padding schemes accepted by `Verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    /// RSASSA-PKCS1 v1.5.
    Pkcs1v15,
    /// RSASSA-PSS.
    Pss,
    /// No padding; the only valid choice for ECDSA.
    None,
}

/// A public key extracted from a certificate or an opaque private key.
///
/// Immutable after construction; equality is component-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKey {
    /// RSA public key.
    Rsa {
        /// Modulus, big-endian without leading zeros.
        modulus: Vec<u8>,
        /// Public exponent, big-endian.
        exponent: Vec<u8>,
    },
    /// ECDSA public key.
    Ecdsa {
        /// DER content bytes of the curve OID (namedCurve parameters).
        curve_oid: Vec<u8>,
        /// Uncompressed X9.62 point (0x04 ‖ x ‖ y).
        point: Vec<u8>,
    },
}

impl PublicKey {
    /// Returns the RSA modulus bit length, or `None` for ECDSA keys.
    pub fn rsa_modulus_bits(&self) -> Option<usize> {
        match self {
            Self::Rsa { modulus, .. } => {
                let stripped: &[u8] = {
                    let mut bytes = modulus.as_slice();
                    while let Some((&0, rest)) = bytes.split_first() {
                        bytes = rest;
                    }
                    bytes
                };

                match stripped.first() {
                    Some(first) => {
                        Some((stripped.len() - 1) * 8 + (8 - first.leading_zeros() as usize))
                    }
                    None => Some(0),
                }
            }
            Self::Ecdsa { .. } => None,
        }
    }
}

/// Options for signing a pre-hashed digest with an opaque key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOptions {
    /// Hash algorithm that produced the digest.
    pub hash: HashAlgorithm,
}

/// Options for decrypting a ciphertext with an opaque key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionOptions {
    /// RSAES-PKCS1 v1.5. A non-zero `key_size` requests session-key
    /// mode, which this runtime does not implement.
    Pkcs1v15 {
        /// Expected session key size, 0 for plain decryption.
        key_size: usize,
    },
    /// RSAES-OAEP with the given MGF1 hash.
    Oaep {
        /// MGF1 / label hash.
        hash: HashAlgorithm,
    },
}

/// Options controlling certificate chain verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Verification time. `None` means wall-clock now.
    pub current_time: Option<SystemTime>,
}

/// An X.509 v3 extension carried by a CSR template: numeric OID plus the
/// DER-encoded extension value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Extension OID in dotted-decimal text.
    pub oid: String,
    /// DER-encoded extension value.
    pub value: Vec<u8>,
}

/// A parsed X.509 certificate.
///
/// Every field is populated from the certificate DER on ingest; `raw`
/// holds the complete encoding and round-trips through re-parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// DER-encoded subject distinguished name.
    pub subject: Vec<u8>,
    /// Subject key identifier, empty when the extension is absent.
    pub subject_key_id: Vec<u8>,
    /// Authority key identifier, empty when the extension is absent.
    pub authority_key_id: Vec<u8>,
    /// DER-encoded issuer distinguished name.
    pub issuer: Vec<u8>,
    /// Serial number, big-endian content bytes.
    pub serial: Vec<u8>,
    /// URIs from the IssuerAltName extension.
    pub issuer_urls: Vec<String>,
    /// Start of the validity interval. `None` on an unbuilt template.
    pub not_before: Option<SystemTime>,
    /// End of the validity interval. `None` on an unbuilt template.
    pub not_after: Option<SystemTime>,
    /// Subject public key. `None` on an unbuilt template.
    pub public_key: Option<PublicKey>,
    /// Extensions a template already carries, applied before the builder
    /// derives its own. Left empty by the parsers, which extract the
    /// known extensions into the dedicated fields above.
    pub extra_extensions: Vec<Extension>,
    /// Complete certificate DER (TBS, signature algorithm, signature).
    pub raw: Vec<u8>,
}

/// Template for building a certificate signing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrTemplate {
    /// DER-encoded subject distinguished name.
    pub subject: Vec<u8>,
    /// DNS subject alternative names.
    pub dns_names: Vec<String>,
    /// Extra extensions to register by OID.
    pub extra_extensions: Vec<Extension>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_name_round_trip() {
        for alg in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha224,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
            HashAlgorithm::Sha512_224,
            HashAlgorithm::Sha512_256,
            HashAlgorithm::Sha3_224,
            HashAlgorithm::Sha3_256,
        ] {
            assert_eq!(alg.as_str().parse::<HashAlgorithm>(), Ok(alg));
        }

        assert!("MD5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_rsa_modulus_bits() {
        let key = PublicKey::Rsa {
            modulus: vec![0x00, 0x80, 0x00],
            exponent: vec![0x01, 0x00, 0x01],
        };
        assert_eq!(key.rsa_modulus_bits(), Some(16));

        let key = PublicKey::Ecdsa {
            curve_oid: vec![0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07],
            point: vec![0x04],
        };
        assert_eq!(key.rsa_modulus_bits(), None);
    }
}
