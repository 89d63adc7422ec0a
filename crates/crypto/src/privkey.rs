// Path: crates/crypto/src/privkey.rs
//! RSA private-key capability backed by in-process key material.
//!
//! Used for keys loaded from PEM through the provider surface. Opaque
//! hardware-held keys implement [`PrivateKeyProvider`] elsewhere; this
//! implementation keeps the key in memory and zeroizes decrypted output.

use crate::error::{Error, Result};
use crate::x509::builder::parse_rsa_private_key_pem;
use aegis_api::crypto::PrivateKeyProvider;
use aegis_types::crypto::{DecryptionOptions, HashAlgorithm, PublicKey, SignOptions};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey};
use zeroize::Zeroizing;

/// A PEM-loaded RSA private key behind the opaque capability seam.
pub struct RsaKeyProvider {
    key: RsaPrivateKey,
}

impl RsaKeyProvider {
    /// Wraps an existing key.
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Parses a PEM private key. ECDSA input is rejected with
    /// `not_supported`.
    pub fn from_pem(pem_blob: &str) -> Result<Self> {
        Ok(Self {
            key: parse_rsa_private_key_pem(pem_blob)?,
        })
    }
}

impl PrivateKeyProvider for RsaKeyProvider {
    fn public_key(&self) -> Result<PublicKey> {
        Ok(PublicKey::Rsa {
            modulus: self.key.n().to_bytes_be(),
            exponent: self.key.e().to_bytes_be(),
        })
    }

    fn sign(&self, digest: &[u8], options: &SignOptions) -> Result<Vec<u8>> {
        let padding = match options.hash {
            HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
            HashAlgorithm::Sha224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
            HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
            HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
            HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
            HashAlgorithm::Sha512_224 => Pkcs1v15Sign::new::<sha2::Sha512_224>(),
            HashAlgorithm::Sha512_256 => Pkcs1v15Sign::new::<sha2::Sha512_256>(),
            HashAlgorithm::Sha3_224 => Pkcs1v15Sign::new::<sha3::Sha3_224>(),
            HashAlgorithm::Sha3_256 => Pkcs1v15Sign::new::<sha3::Sha3_256>(),
        };

        self.key
            .sign(padding, digest)
            .map_err(|err| Error::failed(format!("RSA signing failed: {err}")))
    }

    fn decrypt(&self, cipher: &[u8], options: &DecryptionOptions) -> Result<Zeroizing<Vec<u8>>> {
        let plaintext = match options {
            DecryptionOptions::Pkcs1v15 { key_size } => {
                if *key_size != 0 {
                    return Err(Error::not_supported("PKCS#1 v1.5 session-key decryption"));
                }

                self.key
                    .decrypt(Pkcs1v15Encrypt, cipher)
                    .map_err(|err| Error::failed(format!("RSA decryption failed: {err}")))?
            }
            DecryptionOptions::Oaep { hash } => {
                let padding = match hash {
                    HashAlgorithm::Sha1 => Oaep::new::<sha1::Sha1>(),
                    HashAlgorithm::Sha224 => Oaep::new::<sha2::Sha224>(),
                    HashAlgorithm::Sha256 => Oaep::new::<sha2::Sha256>(),
                    HashAlgorithm::Sha384 => Oaep::new::<sha2::Sha384>(),
                    HashAlgorithm::Sha512 => Oaep::new::<sha2::Sha512>(),
                    other => {
                        return Err(Error::not_supported(format!("OAEP digest {other}")))
                    }
                };

                self.key
                    .decrypt(padding, cipher)
                    .map_err(|err| Error::failed(format!("RSA decryption failed: {err}")))?
            }
        };

        Ok(Zeroizing::new(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> RsaPrivateKey {
        // Deterministic-enough for tests; 1024 bits keeps generation fast.
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    #[test]
    fn test_public_view_matches_key() {
        let key = test_key();
        let provider = RsaKeyProvider::new(key.clone());

        match provider.public_key().unwrap() {
            PublicKey::Rsa { modulus, exponent } => {
                assert_eq!(modulus, key.n().to_bytes_be());
                assert_eq!(exponent, key.e().to_bytes_be());
            }
            other => panic!("unexpected key type: {other:?}"),
        }
    }

    #[test]
    fn test_sign_verifies_with_public_key() {
        let key = test_key();
        let provider = RsaKeyProvider::new(key.clone());

        let digest = crate::hash::digest(HashAlgorithm::Sha256, b"message");
        let signature = provider
            .sign(&digest, &SignOptions { hash: HashAlgorithm::Sha256 })
            .unwrap();

        key.to_public_key()
            .verify(Pkcs1v15Sign::new::<sha2::Sha256>(), &digest, &signature)
            .unwrap();
    }

    #[test]
    fn test_decrypt_round_trip() {
        let key = test_key();
        let provider = RsaKeyProvider::new(key.clone());

        let mut rng = rand::thread_rng();
        let cipher = key
            .to_public_key()
            .encrypt(&mut rng, Pkcs1v15Encrypt, b"secret")
            .unwrap();

        let plain = provider
            .decrypt(&cipher, &DecryptionOptions::Pkcs1v15 { key_size: 0 })
            .unwrap();
        assert_eq!(plain.as_slice(), b"secret");

        // Session-key mode stays unimplemented.
        assert!(provider
            .decrypt(&cipher, &DecryptionOptions::Pkcs1v15 { key_size: 32 })
            .is_err());
    }
}
