// Path: crates/crypto/src/provider.rs
//! The uniform crypto provider facades.
//!
//! Two interchangeable back-ends implement [`CryptoProvider`]:
//!
//! * [`OpaqueCryptoProvider`] keeps private keys behind registry slots in
//!   a PSA-style built-in key range and accepts any well-formed extra CSR
//!   extension OID.
//! * [`NamedProviderCryptoProvider`] models a loadable-provider back-end
//!   that receives the key through a named parameter; it restricts extra
//!   CSR extensions to Extended-Key-Usage.
//!
//! Apart from those policies the two share every code path, so callers
//! observe identical behaviour modulo error message text.

use crate::asn1::{decoder, dn, writer, TAG_OCTET_STRING, TAG_OID};
use crate::error::{Error, Result};
use crate::hash::StreamHasher;
use crate::keyreg::{self, KeyHandle};
use crate::privkey::RsaKeyProvider;
use crate::x509::{builder, parser, verify};
use crate::{aes, pem, random, uuid_gen};
use aegis_api::crypto::{
    AesCipher, AesFactory, AlgorithmIdentifier, Asn1Decoder, Asn1ElementHandler, Asn1Value,
    CryptoProvider, Hash, Hasher, ParseOptions, ParseOutcome, PrivateKeyProvider, Random,
    UuidFactory, X509Provider,
};
use aegis_types::crypto::{
    Certificate, CsrTemplate, HashAlgorithm, Padding, PublicKey, VerifyOptions,
};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Back-end flavour: naming, key binding, and extension policy.
pub trait Backend: Send + Sync + 'static {
    /// Back-end name used in logs.
    const NAME: &'static str;

    /// Validates an extra CSR extension OID (dotted text, already known
    /// to be well-formed).
    fn check_extra_extension(oid: &str) -> Result<()>;

    /// Announces a key binding to the back-end. The provider back-end
    /// passes the handle through its named parameter; the opaque back-end
    /// addresses the slot directly.
    fn bind_key(handle: &KeyHandle) {
        log::debug!(
            "{}: use built-in key: key_id={:#x}",
            Self::NAME,
            handle.key_id
        );
    }
}

/// PSA/opaque-slot back-end marker.
pub struct OpaqueBackend;

impl Backend for OpaqueBackend {
    const NAME: &'static str = "opaque";

    fn check_extra_extension(_oid: &str) -> Result<()> {
        // Any registered numeric OID is accepted; unknown OIDs were
        // already rejected when the dotted text failed to parse.
        Ok(())
    }
}

/// Loadable-provider back-end marker.
pub struct ProviderBackend;

/// Name of the provider parameter carrying the opaque key reference.
pub const PROVIDER_KEY_PARAM: &str = "aegis_key_id";

impl Backend for ProviderBackend {
    const NAME: &'static str = "provider";

    fn check_extra_extension(oid: &str) -> Result<()> {
        if oid != crate::x509::OID_EXT_KEY_USAGE {
            return Err(Error::not_supported("not supported extension"));
        }

        Ok(())
    }

    fn bind_key(handle: &KeyHandle) {
        log::debug!(
            "{}: delegate key operation: {}={:#x}",
            Self::NAME,
            PROVIDER_KEY_PARAM,
            handle.key_id
        );
    }
}

/// Generic provider implementation parameterized by back-end flavour.
pub struct CryptoProviderImpl<B: Backend> {
    initialized: AtomicBool,
    backend: PhantomData<B>,
}

/// The PSA/opaque back-end provider.
pub type OpaqueCryptoProvider = CryptoProviderImpl<OpaqueBackend>;
/// The loadable-provider back-end provider.
pub type NamedProviderCryptoProvider = CryptoProviderImpl<ProviderBackend>;

impl<B: Backend> CryptoProviderImpl<B> {
    /// Creates an uninitialized provider; call
    /// [`CryptoProvider::init`] before use.
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            backend: PhantomData,
        }
    }
}

impl<B: Backend> Default for CryptoProviderImpl<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> CryptoProvider for CryptoProviderImpl<B> {
    fn init(&self) -> Result<()> {
        // Repeated initialization is allowed and a no-op.
        if !self.initialized.swap(true, Ordering::SeqCst) {
            log::debug!("init {} crypto provider", B::NAME);
            keyreg::init();
        }

        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        if self.initialized.swap(false, Ordering::SeqCst) {
            log::debug!("shutdown {} crypto provider", B::NAME);
        }

        Ok(())
    }
}

impl<B: Backend> X509Provider for CryptoProviderImpl<B> {
    fn create_certificate(
        &self,
        template: &Certificate,
        parent: &Certificate,
        priv_key: Arc<dyn PrivateKeyProvider>,
    ) -> Result<String> {
        builder::create_certificate::<B>(template, parent, priv_key)
    }

    fn create_client_cert(
        &self,
        csr_pem: &str,
        ca_key_pem: &str,
        ca_cert_pem: &str,
        serial: &[u8],
    ) -> Result<String> {
        builder::create_client_cert(csr_pem, ca_key_pem, ca_cert_pem, serial)
    }

    fn create_csr(
        &self,
        template: &CsrTemplate,
        priv_key: Arc<dyn PrivateKeyProvider>,
    ) -> Result<String> {
        builder::create_csr::<B>(template, priv_key)
    }

    fn pem_to_x509_certs(&self, pem_blob: &str) -> Result<Vec<Certificate>> {
        log::debug!("{}: convert certs from PEM to x509", B::NAME);

        parser::pem_to_certificates(pem_blob)
    }

    fn x509_cert_to_pem(&self, certificate: &Certificate) -> Result<String> {
        if certificate.raw.is_empty() {
            return Err(Error::invalid_argument("certificate has no DER content"));
        }

        Ok(pem::encode(pem::CERTIFICATE, &certificate.raw))
    }

    fn der_to_x509_cert(&self, der: &[u8]) -> Result<Certificate> {
        log::debug!("{}: convert cert from DER to x509", B::NAME);

        parser::parse_certificate(der)
    }

    fn pem_to_x509_priv_key(&self, pem: &str) -> Result<Arc<dyn PrivateKeyProvider>> {
        log::debug!("{}: create private key from PEM", B::NAME);

        Ok(Arc::new(RsaKeyProvider::from_pem(pem)?))
    }

    fn asn1_encode_dn(&self, text: &str) -> Result<Vec<u8>> {
        dn::encode(text)
    }

    fn asn1_decode_dn(&self, der: &[u8]) -> Result<String> {
        dn::decode(der)
    }

    fn asn1_encode_object_ids(&self, oids: &[String]) -> Result<Vec<u8>> {
        builder::encode_object_ids(oids)
    }

    fn asn1_encode_big_int(&self, number: &[u8]) -> Result<Vec<u8>> {
        Ok(writer::encode_integer(number))
    }

    fn asn1_encode_der_sequence(&self, items: &[Vec<u8>]) -> Result<Vec<u8>> {
        Ok(builder::encode_der_sequence(items))
    }

    fn asn1_decode_octet_string(&self, src: &[u8]) -> Result<Vec<u8>> {
        builder::remove_tag(src, TAG_OCTET_STRING)
    }

    fn asn1_decode_oid(&self, src: &[u8]) -> Result<Vec<u8>> {
        builder::remove_tag(src, TAG_OID)
    }

    fn verify_signature(
        &self,
        public_key: &PublicKey,
        hash: HashAlgorithm,
        padding: Padding,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        verify::verify_signature(public_key, hash, padding, digest, signature)
    }

    fn verify_certificate(
        &self,
        roots: &[Certificate],
        intermediates: &[Certificate],
        options: &VerifyOptions,
        certificate: &Certificate,
    ) -> Result<()> {
        verify::verify_certificate(roots, intermediates, options, certificate)
    }
}

impl<B: Backend> Hasher for CryptoProviderImpl<B> {
    fn create_hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
        Ok(Box::new(StreamHasher::new(algorithm)))
    }
}

impl<B: Backend> Random for CryptoProviderImpl<B> {
    fn rand_int(&self, max: u64) -> Result<u64> {
        random::rand_int(max)
    }

    fn rand_buffer(&self, buffer: &mut [u8]) -> Result<()> {
        random::rand_buffer(buffer)
    }
}

impl<B: Backend> UuidFactory for CryptoProviderImpl<B> {
    fn create_uuid_v4(&self) -> Result<Uuid> {
        uuid_gen::create_uuid_v4()
    }

    fn create_uuid_v5(&self, namespace: &Uuid, name: &[u8]) -> Result<Uuid> {
        uuid_gen::create_uuid_v5(namespace, name)
    }
}

impl<B: Backend> AesFactory for CryptoProviderImpl<B> {
    fn create_aes_encoder(&self, mode: &str, key: &[u8], iv: &[u8]) -> Result<Box<dyn AesCipher>> {
        if mode != "CBC" {
            return Err(Error::not_supported(format!("AES mode {mode}")));
        }

        Ok(Box::new(aes::AesCbcCipher::new(
            key,
            iv,
            aes::Direction::Encrypt,
        )?))
    }

    fn create_aes_decoder(&self, mode: &str, key: &[u8], iv: &[u8]) -> Result<Box<dyn AesCipher>> {
        if mode != "CBC" {
            return Err(Error::not_supported(format!("AES mode {mode}")));
        }

        Ok(Box::new(aes::AesCbcCipher::new(
            key,
            iv,
            aes::Direction::Decrypt,
        )?))
    }
}

impl<B: Backend> Asn1Decoder for CryptoProviderImpl<B> {
    fn read_struct<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()> {
        decoder::read_struct(data, opt, on_element)
    }

    fn read_sequence<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()> {
        decoder::read_sequence(data, opt, on_element)
    }

    fn read_set<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
        on_element: &mut Asn1ElementHandler<'_>,
    ) -> ParseOutcome<'a, ()> {
        decoder::read_set(data, opt, on_element)
    }

    fn read_integer<'a>(&self, data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, i64> {
        decoder::read_integer(data, opt)
    }

    fn read_big_integer<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, Vec<u8>> {
        decoder::read_big_integer(data, opt)
    }

    fn read_oid<'a>(&self, data: &'a [u8], opt: &ParseOptions) -> ParseOutcome<'a, String> {
        decoder::read_oid(data, opt)
    }

    fn read_algorithm_identifier<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, AlgorithmIdentifier> {
        decoder::read_algorithm_identifier(data, opt)
    }

    fn read_octet_string<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, Vec<u8>> {
        decoder::read_octet_string(data, opt)
    }

    fn read_raw_value<'a>(
        &self,
        data: &'a [u8],
        opt: &ParseOptions,
    ) -> ParseOutcome<'a, Asn1Value<'a>> {
        decoder::read_raw_value(data, opt)
    }
}

