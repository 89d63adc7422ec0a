// Path: crates/crypto/src/uuid_gen.rs
//! UUID generation per RFC 4122, versions 4 and 5.

use crate::error::Result;
use crate::random;
use aegis_types::crypto::HashAlgorithm;
use uuid::Uuid;

const UUID_SIZE: usize = 16;

fn set_version_and_variant(bytes: &mut [u8; UUID_SIZE], version: u8) {
    // The version lives in the upper nibble of byte 6.
    if let Some(byte) = bytes.get_mut(6) {
        *byte = (*byte & 0x0f) | (version & 0x0f) << 4;
    }
    // RFC 4122 variant: upper two bits of byte 8 are 10.
    if let Some(byte) = bytes.get_mut(8) {
        *byte = (*byte & 0x3f) | 0x80;
    }
}

/// Creates a version 4 (random) UUID.
pub fn create_uuid_v4() -> Result<Uuid> {
    let mut bytes = [0u8; UUID_SIZE];
    random::rand_buffer(&mut bytes)?;

    set_version_and_variant(&mut bytes, 4);

    Ok(Uuid::from_bytes(bytes))
}

/// Creates a version 5 (SHA-1 name-based) UUID from a namespace and a
/// name: the first 16 bytes of `SHA-1(namespace ‖ name)` with version and
/// variant bits applied.
pub fn create_uuid_v5(namespace: &Uuid, name: &[u8]) -> Result<Uuid> {
    let mut input = Vec::with_capacity(UUID_SIZE + name.len());
    input.extend_from_slice(namespace.as_bytes());
    input.extend_from_slice(name);

    let digest = crate::hash::digest(HashAlgorithm::Sha1, &input);

    let mut bytes = [0u8; UUID_SIZE];
    // A SHA-1 digest is 20 bytes; the UUID takes the first 16.
    if let Some(head) = digest.get(..UUID_SIZE) {
        bytes.copy_from_slice(head);
    }

    set_version_and_variant(&mut bytes, 5);

    Ok(Uuid::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_v4_version_and_variant() {
        for _ in 0..32 {
            let uuid = create_uuid_v4().unwrap();
            let bytes = uuid.as_bytes();

            assert_eq!(bytes[6] >> 4, 4);
            assert_eq!(bytes[8] & 0xc0, 0x80);
        }
    }

    #[test]
    fn test_uuid_v5_url_namespace_fixture() {
        // RFC 4122 URL namespace.
        let namespace = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();

        let uuid = create_uuid_v5(&namespace, b"www.example.org").unwrap();

        assert_eq!(
            uuid.to_string(),
            "74738ff5-5367-5958-9aee-98fffdcd1876"
        );
    }

    #[test]
    fn test_uuid_v5_is_deterministic() {
        let namespace = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();

        let a = create_uuid_v5(&namespace, b"node0").unwrap();
        let b = create_uuid_v5(&namespace, b"node0").unwrap();
        let c = create_uuid_v5(&namespace, b"node1").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
