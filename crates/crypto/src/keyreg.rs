// Path: crates/crypto/src/keyreg.rs
//! Process-wide registry of opaque private keys.
//!
//! The registry is a bounded slot table mapping built-in key identifiers
//! to externally owned [`PrivateKeyProvider`] capabilities. Slots borrow
//! the capability through an `Arc`; key material is never copied. The
//! digest algorithm for a slot is derived from the public key at
//! registration time and is immutable afterwards.
//!
//! Lifecycle is explicit: [`init`] installs the table, [`shutdown`] tears
//! it down after all providers are gone. Registration without `init`
//! fails with `wrong_state`.

use crate::asn1::writer;
use crate::error::{Error, Result};
use aegis_api::crypto::PrivateKeyProvider;
use aegis_types::crypto::{HashAlgorithm, PublicKey, SignOptions};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

/// Compile-time maximum number of concurrently registered keys.
pub const MAX_KEY_SLOTS: usize = 16;

/// First identifier in the back-end's reserved built-in key range.
pub const BUILTIN_KEY_ID_MIN: u32 = 0x7fff_0000;
/// Last identifier in the back-end's reserved built-in key range.
pub const BUILTIN_KEY_ID_MAX: u32 = BUILTIN_KEY_ID_MIN + MAX_KEY_SLOTS as u32 - 1;

/// A registered key: the back-end identifier plus the digest algorithm
/// chosen for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHandle {
    /// Identifier inside the built-in range.
    pub key_id: u32,
    /// Digest algorithm derived from the public key.
    pub hash_alg: HashAlgorithm,
}

/// Key type and parameters reported to the back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttributes {
    /// Identifier of the key.
    pub key_id: u32,
    /// True for RSA keys, false for ECDSA.
    pub is_rsa: bool,
    /// Digest the back-end must pair with the key.
    pub hash_alg: HashAlgorithm,
    /// Curve bit length for ECDSA keys, modulus bit length for RSA.
    pub bits: usize,
    /// Usage flags: the registry only ever grants sign-hash and
    /// verify-hash.
    pub usage: KeyUsage,
}

/// Usage flags granted to registered keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage {
    /// The key may sign pre-hashed digests.
    pub sign_hash: bool,
    /// The key may verify pre-hashed digests.
    pub verify_hash: bool,
}

struct KeySlot {
    key_id: u32,
    hash_alg: HashAlgorithm,
    allocated: bool,
    capability: Option<Arc<dyn PrivateKeyProvider>>,
}

impl KeySlot {
    const fn free() -> Self {
        Self {
            key_id: 0,
            hash_alg: HashAlgorithm::Sha256,
            allocated: false,
            capability: None,
        }
    }
}

struct Registry {
    initialized: bool,
    slots: Vec<KeySlot>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| {
    Mutex::new(Registry {
        initialized: false,
        slots: Vec::new(),
    })
});

/// Installs the slot table. Idempotent.
pub fn init() {
    let mut registry = REGISTRY.lock();
    if registry.initialized {
        return;
    }

    registry.slots = (0..MAX_KEY_SLOTS).map(|_| KeySlot::free()).collect();
    registry.initialized = true;

    log::debug!("key registry initialized: slots={MAX_KEY_SLOTS}");
}

/// Tears the slot table down, dropping every borrowed capability. Must run
/// after all providers are shut down.
pub fn shutdown() {
    let mut registry = REGISTRY.lock();

    let leaked = registry.slots.iter().filter(|slot| slot.allocated).count();
    if leaked > 0 {
        log::warn!("key registry shutdown with allocated slots: count={leaked}");
    }

    registry.slots.clear();
    registry.initialized = false;
}

/// Selects the digest for an RSA key from its modulus length.
fn rsa_hash_algorithm(modulus_bits: usize) -> HashAlgorithm {
    if modulus_bits < 2048 {
        HashAlgorithm::Sha1
    } else if modulus_bits <= 3072 {
        HashAlgorithm::Sha256
    } else if modulus_bits <= 7680 {
        HashAlgorithm::Sha384
    } else {
        HashAlgorithm::Sha512
    }
}

/// Selects the digest for an ECDSA key from its curve length.
fn ecc_hash_algorithm(curve_bits: usize) -> HashAlgorithm {
    if curve_bits <= 160 {
        HashAlgorithm::Sha1
    } else if curve_bits <= 224 {
        HashAlgorithm::Sha224
    } else if curve_bits <= 256 {
        HashAlgorithm::Sha256
    } else if curve_bits <= 384 {
        HashAlgorithm::Sha384
    } else {
        HashAlgorithm::Sha512
    }
}

/// Known named curves: DER OID content bytes and bit length.
const NAMED_CURVES: &[(&[u8], usize)] = &[
    // secp192r1
    (&[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x01], 192),
    // secp224r1
    (&[0x2b, 0x81, 0x04, 0x00, 0x21], 224),
    // secp256r1
    (&[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07], 256),
    // secp384r1
    (&[0x2b, 0x81, 0x04, 0x00, 0x22], 384),
    // secp521r1
    (&[0x2b, 0x81, 0x04, 0x00, 0x23], 521),
    // secp256k1
    (&[0x2b, 0x81, 0x04, 0x00, 0x0a], 256),
];

/// Returns the bit length of a named curve by OID content.
pub fn curve_bits(curve_oid: &[u8]) -> Result<usize> {
    NAMED_CURVES
        .iter()
        .find(|(known, _)| *known == curve_oid)
        .map(|(_, bits)| *bits)
        .ok_or_else(|| Error::not_found("EC group not found"))
}

fn hash_for_public_key(public_key: &PublicKey) -> Result<HashAlgorithm> {
    match public_key {
        PublicKey::Rsa { .. } => {
            let bits = public_key
                .rsa_modulus_bits()
                .ok_or_else(|| Error::invalid_argument("bad RSA public key"))?;
            Ok(rsa_hash_algorithm(bits))
        }
        PublicKey::Ecdsa { curve_oid, .. } => Ok(ecc_hash_algorithm(curve_bits(curve_oid)?)),
    }
}

/// Registers a private-key capability and returns its handle.
///
/// Scans for a free identifier in the built-in range and a free slot;
/// either being exhausted fails with `out_of_range`.
pub fn register(capability: Arc<dyn PrivateKeyProvider>) -> Result<KeyHandle> {
    let public_key = capability.public_key()?;
    let hash_alg = hash_for_public_key(&public_key)?;

    let mut registry = REGISTRY.lock();
    if !registry.initialized {
        return Err(Error::wrong_state("key registry is not initialized"));
    }

    for key_id in BUILTIN_KEY_ID_MIN..=BUILTIN_KEY_ID_MAX {
        if registry
            .slots
            .iter()
            .any(|slot| slot.allocated && slot.key_id == key_id)
        {
            continue;
        }

        let Some(slot) = registry.slots.iter_mut().find(|slot| !slot.allocated) else {
            return Err(Error::OutOfRange("no free key slot".into()));
        };

        slot.key_id = key_id;
        slot.hash_alg = hash_alg;
        slot.allocated = true;
        slot.capability = Some(capability);

        log::debug!("add opaque key: key_id={key_id:#x}, hash={hash_alg}");

        return Ok(KeyHandle { key_id, hash_alg });
    }

    Err(Error::OutOfRange("built-in key id range exhausted".into()))
}

/// Releases a slot. The borrowed capability reference is dropped, which
/// destroys any key material derived for the back-end.
pub fn deregister(key_id: u32) {
    let mut registry = REGISTRY.lock();

    log::debug!("remove opaque key: key_id={key_id:#x}");

    if let Some(slot) = registry
        .slots
        .iter_mut()
        .find(|slot| slot.allocated && slot.key_id == key_id)
    {
        slot.allocated = false;
        slot.capability = None;
    }
}

/// Back-end callback: resolves a built-in key identifier to its slot
/// number.
pub fn slot_number(key_id: u32) -> Result<usize> {
    let registry = REGISTRY.lock();

    registry
        .slots
        .iter()
        .position(|slot| slot.allocated && slot.key_id == key_id)
        .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))
}

/// Back-end callback: populates the attributes of a registered key.
pub fn key_attributes(key_id: u32) -> Result<KeyAttributes> {
    let registry = REGISTRY.lock();

    let slot = registry
        .slots
        .iter()
        .find(|slot| slot.allocated && slot.key_id == key_id)
        .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?;

    let capability = slot
        .capability
        .as_ref()
        .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?;
    let public_key = capability.public_key()?;

    let (is_rsa, bits) = match &public_key {
        PublicKey::Rsa { .. } => (
            true,
            public_key
                .rsa_modulus_bits()
                .ok_or_else(|| Error::invalid_argument("bad RSA public key"))?,
        ),
        PublicKey::Ecdsa { curve_oid, .. } => (false, curve_bits(curve_oid)?),
    };

    Ok(KeyAttributes {
        key_id,
        is_rsa,
        hash_alg: slot.hash_alg,
        bits,
        usage: KeyUsage {
            sign_hash: true,
            verify_hash: true,
        },
    })
}

/// Back-end callback: signs a pre-hashed digest by dispatching to the
/// stored capability.
pub fn sign_with_key(key_id: u32, digest: &[u8]) -> Result<Vec<u8>> {
    let capability = {
        let registry = REGISTRY.lock();
        let slot = registry
            .slots
            .iter()
            .find(|slot| slot.allocated && slot.key_id == key_id)
            .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?;

        slot.capability
            .clone()
            .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?
    };

    // Sign outside the registry lock; the capability may block on its
    // secure element.
    let hash_alg = handle_hash(key_id)?;
    capability.sign(digest, &SignOptions { hash: hash_alg })
}

fn handle_hash(key_id: u32) -> Result<HashAlgorithm> {
    let registry = REGISTRY.lock();
    registry
        .slots
        .iter()
        .find(|slot| slot.allocated && slot.key_id == key_id)
        .map(|slot| slot.hash_alg)
        .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))
}

/// Back-end callback: returns the public key of a registered key.
pub fn public_key(key_id: u32) -> Result<PublicKey> {
    let capability = {
        let registry = REGISTRY.lock();
        let slot = registry
            .slots
            .iter()
            .find(|slot| slot.allocated && slot.key_id == key_id)
            .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?;

        slot.capability
            .clone()
            .ok_or_else(|| Error::not_found(format!("built-in key {key_id:#x}")))?
    };

    capability.public_key()
}

/// Back-end callback: exports the public key of a registered key in DER.
///
/// RSA keys export as the PKCS#1 `RSAPublicKey` SEQUENCE; ECDSA keys as
/// the uncompressed X9.62 point.
pub fn export_public_key_der(key_id: u32) -> Result<Vec<u8>> {
    match public_key(key_id)? {
        PublicKey::Rsa { modulus, exponent } => {
            let n = writer::encode_integer(&modulus);
            let e = writer::encode_integer(&exponent);
            Ok(writer::encode_sequence(&[n.as_slice(), e.as_slice()]))
        }
        PublicKey::Ecdsa { point, .. } => Ok(point),
    }
}

/// RAII guard deregistering a key when the certificate or CSR operation
/// that registered it returns.
pub struct RegisteredKey {
    handle: KeyHandle,
}

impl RegisteredKey {
    /// Registers the capability for the duration of the guard.
    pub fn new(capability: Arc<dyn PrivateKeyProvider>) -> Result<Self> {
        Ok(Self {
            handle: register(capability)?,
        })
    }

    /// Returns the registered handle.
    pub fn handle(&self) -> KeyHandle {
        self.handle
    }
}

impl Drop for RegisteredKey {
    fn drop(&mut self) {
        deregister(self.handle.key_id);
    }
}
