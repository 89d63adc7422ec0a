// Path: crates/crypto/src/hash.rs
//! Streaming hashers over the SHA-1, SHA-2, and SHA-3 families.

use crate::error::Result;
use aegis_api::crypto::Hash;
use aegis_types::crypto::HashAlgorithm;
use sha1::Sha1;
use sha2::digest::Digest;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256};

enum HasherState {
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Sha512_224(Sha512_224),
    Sha512_256(Sha512_256),
    Sha3_224(Sha3_224),
    Sha3_256(Sha3_256),
}

/// A streaming hash computation dispatching over the supported
/// algorithms.
pub struct StreamHasher {
    state: HasherState,
}

impl StreamHasher {
    /// Creates a hasher for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha1 => HasherState::Sha1(Sha1::new()),
            HashAlgorithm::Sha224 => HasherState::Sha224(Sha224::new()),
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => HasherState::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
            HashAlgorithm::Sha512_224 => HasherState::Sha512_224(Sha512_224::new()),
            HashAlgorithm::Sha512_256 => HasherState::Sha512_256(Sha512_256::new()),
            HashAlgorithm::Sha3_224 => HasherState::Sha3_224(Sha3_224::new()),
            HashAlgorithm::Sha3_256 => HasherState::Sha3_256(Sha3_256::new()),
        };

        Self { state }
    }
}

impl Hash for StreamHasher {
    fn update(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.state {
            HasherState::Sha1(digest) => digest.update(data),
            HasherState::Sha224(digest) => digest.update(data),
            HasherState::Sha256(digest) => digest.update(data),
            HasherState::Sha384(digest) => digest.update(data),
            HasherState::Sha512(digest) => digest.update(data),
            HasherState::Sha512_224(digest) => digest.update(data),
            HasherState::Sha512_256(digest) => digest.update(data),
            HasherState::Sha3_224(digest) => digest.update(data),
            HasherState::Sha3_256(digest) => digest.update(data),
        }

        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        let digest = match self.state {
            HasherState::Sha1(digest) => digest.finalize().to_vec(),
            HasherState::Sha224(digest) => digest.finalize().to_vec(),
            HasherState::Sha256(digest) => digest.finalize().to_vec(),
            HasherState::Sha384(digest) => digest.finalize().to_vec(),
            HasherState::Sha512(digest) => digest.finalize().to_vec(),
            HasherState::Sha512_224(digest) => digest.finalize().to_vec(),
            HasherState::Sha512_256(digest) => digest.finalize().to_vec(),
            HasherState::Sha3_224(digest) => digest.finalize().to_vec(),
            HasherState::Sha3_256(digest) => digest.finalize().to_vec(),
        };

        Ok(digest)
    }
}

/// One-shot digest convenience.
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        HashAlgorithm::Sha512_224 => Sha512_224::digest(data).to_vec(),
        HashAlgorithm::Sha512_256 => Sha512_256::digest(data).to_vec(),
        HashAlgorithm::Sha3_224 => Sha3_224::digest(data).to_vec(),
        HashAlgorithm::Sha3_256 => Sha3_256::digest(data).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";

        for algorithm in [
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
            let mut hasher = Box::new(StreamHasher::new(algorithm));
            hasher.update(&data[..10]).unwrap();
            hasher.update(&data[10..]).unwrap();
            let streamed = hasher.finalize().unwrap();

            assert_eq!(streamed, digest(algorithm, data), "{algorithm}");
            assert_eq!(streamed.len(), algorithm.digest_size(), "{algorithm}");
        }
    }

    #[test]
    fn test_sha256_fixture() {
        let digest = digest(HashAlgorithm::Sha256, b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha1_fixture() {
        let digest = digest(HashAlgorithm::Sha1, b"abc");
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }
}
