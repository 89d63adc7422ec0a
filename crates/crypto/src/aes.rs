// Path: crates/crypto/src/aes.rs
//! Stateful AES-CBC block cipher with PKCS#7 padding.
//!
//! The cipher consumes exactly one 16-byte block per call. The decryptor
//! holds the most recent plaintext block back so `finalize` can strip the
//! padding; the encryptor emits blocks immediately and `finalize` appends
//! the padding block. Any use after `finalize`, or a call in the wrong
//! direction, is a `wrong_state` error.

use crate::error::{Error, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use aegis_api::crypto::AesCipher;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

enum AesKey {
    Aes128(Box<Aes128>),
    Aes192(Box<Aes192>),
    Aes256(Box<Aes256>),
}

impl AesKey {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(Self::Aes128(Box::new(
                Aes128::new_from_slice(key)
                    .map_err(|_| Error::invalid_argument("bad AES-128 key"))?,
            ))),
            24 => Ok(Self::Aes192(Box::new(
                Aes192::new_from_slice(key)
                    .map_err(|_| Error::invalid_argument("bad AES-192 key"))?,
            ))),
            32 => Ok(Self::Aes256(Box::new(
                Aes256::new_from_slice(key)
                    .map_err(|_| Error::invalid_argument("bad AES-256 key"))?,
            ))),
            other => Err(Error::invalid_argument(format!(
                "AES key must be 16, 24, or 32 bytes, got {other}"
            ))),
        }
    }

    fn encrypt(&self, block: &mut [u8; BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes192(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut [u8; BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block(block),
            Self::Aes192(cipher) => cipher.decrypt_block(block),
            Self::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}

/// Cipher direction fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Encrypting cipher.
    Encrypt,
    /// Decrypting cipher.
    Decrypt,
}

/// Stateful AES-CBC cipher with PKCS#7 padding.
pub struct AesCbcCipher {
    key: AesKey,
    chain: [u8; BLOCK_SIZE],
    direction: Direction,
    // Decrypt path: the last plaintext block, withheld until the next
    // block or finalize decides whether it carries padding.
    pending: Option<[u8; BLOCK_SIZE]>,
    finalized: bool,
}

impl AesCbcCipher {
    /// Creates a cipher. `iv` must be 16 bytes; `key` 16, 24, or 32
    /// bytes selecting AES-128/192/256.
    pub fn new(key: &[u8], iv: &[u8], direction: Direction) -> Result<Self> {
        if iv.len() != BLOCK_SIZE {
            return Err(Error::invalid_argument("AES-CBC IV must be 16 bytes"));
        }

        let mut chain = [0u8; BLOCK_SIZE];
        chain.copy_from_slice(iv);

        Ok(Self {
            key: AesKey::new(key)?,
            chain,
            direction,
            pending: None,
            finalized: false,
        })
    }

    fn check_live(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::wrong_state("cipher already finalized"));
        }

        Ok(())
    }

    fn full_block(input: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
        let mut block = [0u8; BLOCK_SIZE];
        if input.len() != BLOCK_SIZE {
            return Err(Error::invalid_argument("AES-CBC expects full 16-byte blocks"));
        }
        block.copy_from_slice(input);

        Ok(block)
    }

    fn encrypt_chained(&mut self, mut block: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        for (byte, chained) in block.iter_mut().zip(self.chain.iter()) {
            *byte ^= chained;
        }
        self.key.encrypt(&mut block);
        self.chain = block;

        block
    }
}

impl AesCipher for AesCbcCipher {
    fn encrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.check_live()?;

        if self.direction != Direction::Encrypt {
            return Err(Error::wrong_state("decrypt cipher used for encryption"));
        }
        if input.is_empty() {
            return Err(Error::invalid_argument("empty AES-CBC block"));
        }

        let block = Self::full_block(input)?;

        Ok(self.encrypt_chained(block).to_vec())
    }

    fn decrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.check_live()?;

        if self.direction != Direction::Decrypt {
            return Err(Error::wrong_state("encrypt cipher used for decryption"));
        }

        let ciphertext = Self::full_block(input)?;

        let mut plain = ciphertext;
        self.key.decrypt(&mut plain);
        for (byte, chained) in plain.iter_mut().zip(self.chain.iter()) {
            *byte ^= chained;
        }
        self.chain = ciphertext;

        // Withhold this block: it may be the padded tail.
        let released = self.pending.replace(plain);

        Ok(released.map(|block| block.to_vec()).unwrap_or_default())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        self.check_live()?;
        self.finalized = true;

        match self.direction {
            Direction::Encrypt => {
                // Inputs are always whole blocks, so the PKCS#7 tail is a
                // full block of 0x10.
                let padding = [BLOCK_SIZE as u8; BLOCK_SIZE];

                Ok(self.encrypt_chained(padding).to_vec())
            }
            Direction::Decrypt => {
                let block = self
                    .pending
                    .take()
                    .ok_or_else(|| Error::wrong_state("no data to finalize"))?;

                let pad_len = usize::from(*block.last().unwrap_or(&0));
                if pad_len == 0 || pad_len > BLOCK_SIZE {
                    return Err(Error::failed("bad PKCS#7 padding"));
                }

                let (payload, padding) = block.split_at(BLOCK_SIZE - pad_len);
                if padding.iter().any(|&byte| usize::from(byte) != pad_len) {
                    return Err(Error::failed("bad PKCS#7 padding"));
                }

                Ok(payload.to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(key: &[u8], plaintext: &[u8]) {
        let iv = [0x42u8; BLOCK_SIZE];

        let mut encoder = AesCbcCipher::new(key, &iv, Direction::Encrypt).unwrap();
        let mut ciphertext = Vec::new();
        for block in plaintext.chunks(BLOCK_SIZE) {
            ciphertext.extend(encoder.encrypt_block(block).unwrap());
        }
        ciphertext.extend(encoder.finalize().unwrap());

        assert_eq!(ciphertext.len(), plaintext.len() + BLOCK_SIZE);

        let mut decoder = AesCbcCipher::new(key, &iv, Direction::Decrypt).unwrap();
        let mut decrypted = Vec::new();
        for block in ciphertext.chunks(BLOCK_SIZE) {
            decrypted.extend(decoder.decrypt_block(block).unwrap());
        }
        decrypted.extend(decoder.finalize().unwrap());

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_all_key_sizes() {
        let plaintext = [0x5au8; BLOCK_SIZE * 4];

        round_trip(&[0x11; 16], &plaintext);
        round_trip(&[0x22; 24], &plaintext);
        round_trip(&[0x33; 32], &plaintext);
    }

    #[test]
    fn test_bad_parameters_rejected() {
        assert!(AesCbcCipher::new(&[0u8; 15], &[0u8; 16], Direction::Encrypt).is_err());
        assert!(AesCbcCipher::new(&[0u8; 16], &[0u8; 15], Direction::Encrypt).is_err());
    }

    #[test]
    fn test_wrong_direction_is_wrong_state() {
        let mut encoder = AesCbcCipher::new(&[0u8; 16], &[0u8; 16], Direction::Encrypt).unwrap();
        let err = encoder.decrypt_block(&[0u8; 16]).unwrap_err();
        assert_eq!(aegis_api::error::ErrorCode::code(&err), "WRONG_STATE");

        let mut decoder = AesCbcCipher::new(&[0u8; 16], &[0u8; 16], Direction::Decrypt).unwrap();
        let err = decoder.encrypt_block(&[0u8; 16]).unwrap_err();
        assert_eq!(aegis_api::error::ErrorCode::code(&err), "WRONG_STATE");
    }

    #[test]
    fn test_use_after_finalize_is_wrong_state() {
        let mut encoder = AesCbcCipher::new(&[0u8; 16], &[0u8; 16], Direction::Encrypt).unwrap();
        encoder.encrypt_block(&[0u8; 16]).unwrap();
        encoder.finalize().unwrap();

        assert!(encoder.encrypt_block(&[0u8; 16]).is_err());
        assert!(encoder.finalize().is_err());
    }

    #[test]
    fn test_decrypt_partial_block_rejected() {
        let mut decoder = AesCbcCipher::new(&[0u8; 16], &[0u8; 16], Direction::Decrypt).unwrap();
        assert!(decoder.decrypt_block(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_corrupted_padding_detected() {
        let iv = [0u8; BLOCK_SIZE];
        let key = [0x11u8; 16];

        let mut encoder = AesCbcCipher::new(&key, &iv, Direction::Encrypt).unwrap();
        let mut ciphertext = encoder.encrypt_block(&[0xaa; BLOCK_SIZE]).unwrap();
        ciphertext.extend(encoder.finalize().unwrap());

        // Flip a bit in the padding block.
        let last = ciphertext.last_mut().unwrap();
        *last ^= 0x01;

        let mut decoder = AesCbcCipher::new(&key, &iv, Direction::Decrypt).unwrap();
        for block in ciphertext.chunks(BLOCK_SIZE) {
            decoder.decrypt_block(block).unwrap();
        }
        assert!(decoder.finalize().is_err());
    }
}
