//! Public-key pinning for the default ttycast endpoint.
//!
//! The hosted service's certificates must chain to a trusted root *and*
//! carry one of the bundled public keys somewhere in the presented chain.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, SubjectPublicKeyInfoDer, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::UploadError;

/// SPKI pins for the default endpoint, shipped with the binary.
const BUNDLED_PINS: &[u8] = include_bytes!("../../certs/pinned_keys.pem");

/// A set of DER-encoded SubjectPublicKeyInfo blobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    keys: Vec<Vec<u8>>,
}

impl PinSet {
    pub fn bundled() -> Result<Self, UploadError> {
        Self::from_pem(BUNDLED_PINS)
    }

    /// Parse every `PUBLIC KEY` block in `pem`. At least one is required.
    pub fn from_pem(pem: &[u8]) -> Result<Self, UploadError> {
        let keys = SubjectPublicKeyInfoDer::pem_slice_iter(pem)
            .map(|key| key.map(|k| k.as_ref().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| UploadError::InvalidPins(err.to_string()))?;

        if keys.is_empty() {
            return Err(UploadError::InvalidPins(
                "no PUBLIC KEY blocks found".to_string(),
            ));
        }
        Ok(Self { keys })
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<(), UploadError> {
        let pem = std::fs::read(path)
            .map_err(|err| UploadError::InvalidPins(format!("{}: {err}", path.display())))?;
        let extra = Self::from_pem(&pem)?;
        debug!("Loaded {} extra pinned keys from {}", extra.len(), path.display());
        self.keys.extend(extra.keys);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, spki: &[u8]) -> bool {
        self.keys.iter().any(|k| k == spki)
    }

    /// True if the certificate's SubjectPublicKeyInfo is pinned.
    pub fn matches_cert(&self, cert: &CertificateDer<'_>) -> bool {
        match x509_parser::parse_x509_certificate(cert.as_ref()) {
            Ok((_, parsed)) => self.contains(parsed.public_key().raw),
            Err(err) => {
                debug!("Skipping unparsable certificate in chain: {err}");
                false
            }
        }
    }
}

/// Wraps a standard verifier and additionally requires a pinned key.
///
/// A pin failure is recorded in `mismatch` so the upload client can tell it
/// apart from ordinary TLS errors after reqwest has wrapped it.
#[derive(Debug)]
pub struct PinnedKeyVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    pins: PinSet,
    mismatch: Arc<AtomicBool>,
}

impl PinnedKeyVerifier {
    pub fn new(inner: Arc<dyn ServerCertVerifier>, pins: PinSet, mismatch: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            pins,
            mismatch,
        }
    }
}

impl ServerCertVerifier for PinnedKeyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;

        if self.pins.matches_cert(end_entity)
            || intermediates.iter().any(|cert| self.pins.matches_cert(cert))
        {
            return Ok(verified);
        }

        warn!(
            "Certificate chain for {:?} carries none of the {} pinned keys",
            server_name,
            self.pins.len()
        );
        self.mismatch.store(true, Ordering::SeqCst);
        Err(rustls::Error::General(
            "server public key does not match any pinned key".to_string(),
        ))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
