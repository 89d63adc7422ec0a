// Path: crates/api/src/crypto/mod.rs
//! Defines unified traits for the crypto provider surface.

use crate::error::{Error, Result};
use aegis_types::crypto::{
    Certificate, CsrTemplate, DecryptionOptions, HashAlgorithm, Padding, PublicKey, SignOptions,
    VerifyOptions,
};
use std::sync::Arc;
use uuid::Uuid;
use zeroize::Zeroizing;

/// An opaque private-key capability.
///
/// Implementations hold the key material behind this seam — typically in a
/// secure element or an external key store — and only ever expose the
/// public view, a sign-digest primitive, and a decrypt primitive. The
/// registry borrows capabilities; it never copies key material.
pub trait PrivateKeyProvider: Send + Sync {
    /// Returns the public part of the key.
    fn public_key(&self) -> Result<PublicKey>;

    /// Signs a pre-hashed digest.
    fn sign(&self, digest: &[u8], options: &SignOptions) -> Result<Vec<u8>>;

    /// Decrypts a ciphertext. The plaintext is zeroized on drop.
    fn decrypt(&self, cipher: &[u8], options: &DecryptionOptions) -> Result<Zeroizing<Vec<u8>>>;
}

/// A streaming hash computation.
///
/// `finalize` consumes the hasher, so use-after-finalize is unrepresentable.
pub trait Hash: Send {
    /// Feeds input data into the hash state.
    fn update(&mut self, data: &[u8]) -> Result<()>;

    /// Completes the computation and returns the digest.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Factory for streaming hashers.
pub trait Hasher {
    /// Creates a hash instance for the given algorithm.
    fn create_hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>>;
}

/// Cryptographically secure random values.
pub trait Random {
    /// Returns a uniform random integer in `[0, max)`.
    fn rand_int(&self, max: u64) -> Result<u64>;

    /// Fills `buffer` with random bytes.
    fn rand_buffer(&self, buffer: &mut [u8]) -> Result<()>;
}

/// UUID generation per RFC 4122.
pub trait UuidFactory {
    /// Creates a version 4 (random) UUID.
    fn create_uuid_v4(&self) -> Result<Uuid>;

    /// Creates a version 5 (SHA-1 name-based) UUID from a namespace and a
    /// name.
    fn create_uuid_v5(&self, namespace: &Uuid, name: &[u8]) -> Result<Uuid>;
}

/// A stateful AES block cipher.
///
/// Created in a fixed direction; calling the opposite-direction operation,
/// or any operation after `finalize`, returns `wrong_state`.
pub trait AesCipher: Send {
    /// Encrypts one 16-byte block. Returns the produced ciphertext, which
    /// may be empty while the mode buffers data.
    fn encrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts one 16-byte block. The input length is enforced.
    fn decrypt_block(&mut self, input: &[u8]) -> Result<Vec<u8>>;

    /// Completes the operation and returns the final (padded or unpadded)
    /// block.
    fn finalize(&mut self) -> Result<Vec<u8>>;
}

/// Factory for AES encoders and decoders.
pub trait AesFactory {
    /// Creates an encrypting cipher. Only the "CBC" mode is supported;
    /// `iv` must be 16 bytes and `key` 16, 24, or 32 bytes.
    fn create_aes_encoder(&self, mode: &str, key: &[u8], iv: &[u8]) -> Result<Box<dyn AesCipher>>;

    /// Creates a decrypting cipher with the same parameter contract as
    /// [`AesFactory::create_aes_encoder`].
    fn create_aes_decoder(&self, mode: &str, key: &[u8], iv: &[u8]) -> Result<Box<dyn AesCipher>>;
}

/// Class of an ASN.1 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Universal class (0b00).
    Universal,
    /// Application class (0b01).
    Application,
    /// Context-specific class (0b10).
    ContextSpecific,
    /// Private class (0b11).
    Private,
}

/// One decoded ASN.1 TLV element, borrowing its content from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asn1Value<'a> {
    /// Tag class.
    pub tag_class: TagClass,
    /// Tag number.
    pub tag_number: u32,
    /// Whether the element is constructed.
    pub constructed: bool,
    /// Raw content bytes.
    pub content: &'a [u8],
}

/// An owned copy of an ASN.1 element, used where the borrow cannot be
/// carried (e.g. `AlgorithmIdentifier` parameters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAsn1Value {
    /// Tag class.
    pub tag_class: TagClass,
    /// Tag number.
    pub tag_number: u32,
    /// Whether the element is constructed.
    pub constructed: bool,
    /// Raw content bytes.
    pub content: Vec<u8>,
}

impl From<&Asn1Value<'_>> for OwnedAsn1Value {
    fn from(value: &Asn1Value<'_>) -> Self {
        Self {
            tag_class: value.tag_class,
            tag_number: value.tag_number,
            constructed: value.constructed,
            content: value.content.to_vec(),
        }
    }
}

/// An ASN.1 `AlgorithmIdentifier`: OID plus optional raw parameters with
/// their original tag preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    /// Algorithm OID in dotted-decimal text.
    pub oid: String,
    /// Raw parameters, absent when the field is omitted.
    pub params: Option<OwnedAsn1Value>,
}

/// Options controlling a single ASN.1 read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// When set, a missing or tag-mismatched element is not an error: the
    /// reader reports it absent and echoes back the input slice.
    pub optional: bool,
    /// Explicit tag number override to match instead of the reader's
    /// default universal tag.
    pub tag: Option<u32>,
}

impl ParseOptions {
    /// Options matching an explicit tag.
    pub fn with_tag(tag: u32) -> Self {
        Self {
            optional: false,
            tag: Some(tag),
        }
    }

    /// Options marking the element optional.
    pub fn optional() -> Self {
        Self {
            optional: true,
            tag: None,
        }
    }
}

/// Outcome of an ASN.1 read: the decoded value (absent on an optional
/// miss) and the bytes remaining after the consumed element. On an
/// optional miss the remaining slice is the untouched input so the caller
/// can fall through to the next alternative.
pub type ParseOutcome<'a, T> = Result<(Option<T>, &'a [u8]), Error>;

/// Callback invoked once per TLV element by the container readers.
pub type Asn1ElementHandler<'h> = dyn FnMut(&Asn1Value<'_>) -> Result<()> + 'h;

/// Streaming ASN.1 DER decoder over a borrowed byte slice.
pub trait Asn1Decoder {
    /// Consumes one TLV header and hands the content to `on_element`.
    fn read_struct<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()>;

    /// Consumes a SEQUENCE header and invokes `on_element` per element.
    fn read_sequence<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()>;

    /// Consumes a SET header and invokes `on_element` per element.
    fn read_set<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()>;

    /// Reads an INTEGER into a host integer.
    fn read_integer<'a>(&self, data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, i64>;

    /// Reads an INTEGER of arbitrary size as big-endian bytes.
    fn read_big_integer<'a>(&self, data: &'a [u8], opt: &ParseOptions)
        -> ParseOutcome<'a, Vec<u8>>;

    /// Reads an OBJECT IDENTIFIER as dotted-decimal text.
    fn read_oid<'a>(&self, data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, String>;

    /// Reads an `AlgorithmIdentifier` (OID + optional ANY parameters).
    fn read_algorithm_identifier<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, AlgorithmIdentifier>;

    /// Reads an OCTET STRING, copying the content verbatim.
    fn read_octet_string<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, Vec<u8>>;

    /// Reads one raw element without decoding its content.
    fn read_raw_value<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, Asn1Value<'a>>;
}

/// X.509 certificate and CSR operations.
pub trait X509Provider {
    /// Creates a certificate from a template, signed with the opaque key.
    /// `parent` supplies the issuer identity for non-self-signed chains.
    /// The capability is borrowed for the duration of the call: the
    /// back-end registers it, signs through the registry dispatch, and
    /// releases the slot before returning.
    fn create_certificate(
        &self,
        template: &Certificate,
        parent: &Certificate,
        priv_key: Arc<dyn PrivateKeyProvider>,
    ) -> Result<String>;

    /// Issues a client certificate from a CSR using a CA key and CA
    /// certificate, valid for one year and signed with SHA-256.
    fn create_client_cert(
        &self,
        csr_pem: &str,
        ca_key_pem: &str,
        ca_cert_pem: &str,
        serial: &[u8],
    ) -> Result<String>;

    /// Creates a CSR from a template, signed with the opaque key. The
    /// capability is released before the call returns.
    fn create_csr(
        &self,
        template: &CsrTemplate,
        priv_key: Arc<dyn PrivateKeyProvider>,
    ) -> Result<String>;

    /// Parses every certificate in a PEM blob. The result count equals the
    /// number of `BEGIN CERTIFICATE` blocks in the input.
    fn pem_to_x509_certs(&self, pem_blob: &str) -> Result<Vec<Certificate>>;

    /// Re-frames a parsed certificate as PEM without re-encoding the DER.
    fn x509_cert_to_pem(&self, certificate: &Certificate) -> Result<String>;

    /// Parses a single DER certificate.
    fn der_to_x509_cert(&self, der: &[u8]) -> Result<Certificate>;

    /// Parses a private key from PEM into an opaque capability. RSA keys
    /// only; ECDSA input returns `not_supported`.
    fn pem_to_x509_priv_key(&self, pem: &str) -> Result<Arc<dyn PrivateKeyProvider>>;

    /// Builds a DER distinguished name from `"CN=..., C=..."` text.
    fn asn1_encode_dn(&self, text: &str) -> Result<Vec<u8>>;

    /// Renders a DER distinguished name as normalized `"K=V, K=V"` text.
    fn asn1_decode_dn(&self, dn: &[u8]) -> Result<String>;

    /// Encodes dotted-decimal OIDs as a DER SEQUENCE OF OBJECT IDENTIFIER.
    fn asn1_encode_object_ids(&self, oids: &[String]) -> Result<Vec<u8>>;

    /// Encodes big-endian bytes as a DER INTEGER.
    fn asn1_encode_big_int(&self, number: &[u8]) -> Result<Vec<u8>>;

    /// Wraps pre-encoded DER items in a DER SEQUENCE.
    fn asn1_encode_der_sequence(&self, items: &[Vec<u8>]) -> Result<Vec<u8>>;

    /// Extracts the content of a DER OCTET STRING.
    fn asn1_decode_octet_string(&self, src: &[u8]) -> Result<Vec<u8>>;

    /// Extracts the content bytes of a DER OBJECT IDENTIFIER.
    fn asn1_decode_oid(&self, src: &[u8]) -> Result<Vec<u8>>;

    /// Verifies a signature over a pre-hashed digest.
    fn verify_signature(
        &self,
        public_key: &PublicKey,
        hash: HashAlgorithm,
        padding: Padding,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<()>;

    /// Verifies a certificate against roots and intermediates.
    fn verify_certificate(
        &self,
        roots: &[Certificate],
        intermediates: &[Certificate],
        options: &VerifyOptions,
        certificate: &Certificate,
    ) -> Result<()>;
}

/// The uniform crypto provider interface: X.509, hashing, randomness,
/// UUIDs, AES, and the streaming ASN.1 readers behind one object.
///
/// Both back-ends implement this trait and must behave identically modulo
/// opaque error message text.
pub trait CryptoProvider:
    X509Provider + Hasher + Random + UuidFactory + AesFactory + Asn1Decoder + Send + Sync
{
    /// Initializes back-end resources. Safe to call more than once.
    fn init(&self) -> Result<()>;

    /// Releases all back-end resources, including registry slots the
    /// provider still holds.
    fn shutdown(&self) -> Result<()>;
}
