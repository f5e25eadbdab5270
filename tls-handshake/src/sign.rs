use std::fmt;
use std::sync::Arc;

use pki_types::CertificateDer;

use crate::enums::{SignatureAlgorithm, SignatureScheme};
use crate::error::Error;

/// An abstract signing key.
///
/// This crate never holds private keys itself: client authentication
/// signs through this trait.
pub trait SigningKey: Send + Sync {
    /// Choose a `SignatureScheme` from those offered.
    ///
    /// Expresses the choice by returning something that implements `Signer`,
    /// using the chosen scheme.
    ///
    /// Before TLS 1.2 the only schemes offered are
    /// `SignatureScheme::RSA_PKCS1_MD5_SHA1` and
    /// `SignatureScheme::ECDSA_SHA1_Legacy`.
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>>;

    /// What kind of key we have.
    fn algorithm(&self) -> SignatureAlgorithm;
}

/// A thing that can sign a message.
pub trait Signer: Send + Sync {
    /// Signs `message` using the selected scheme.
    ///
    /// For the legacy schemes `message` is already the digest to sign:
    /// 36 bytes of MD5‖SHA-1 for RSA, or 20 bytes of SHA-1 for ECDSA.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error>;

    /// Reveals which scheme will be used when you call `sign()`.
    fn scheme(&self) -> SignatureScheme;
}

/// A packaged-together certificate chain, matching `SigningKey` and
/// optional stapled OCSP response.
#[derive(Clone)]
pub struct CertifiedKey {
    /// The certificate chain.
    pub cert: Vec<CertificateDer<'static>>,

    /// The certified key.
    pub key: Arc<dyn SigningKey>,

    /// An optional OCSP response from the certificate issuer,
    /// attesting to its continued validity.
    pub ocsp: Option<Vec<u8>>,
}

impl CertifiedKey {
    /// Make a new CertifiedKey, with the given chain and key.
    ///
    /// The cert chain must not be empty. The first certificate in the chain
    /// must be the end-entity certificate.
    pub fn new(cert: Vec<CertificateDer<'static>>, key: Arc<dyn SigningKey>) -> Self {
        Self {
            cert,
            key,
            ocsp: None,
        }
    }

    /// The end-entity certificate.
    pub fn end_entity_cert(&self) -> Result<&CertificateDer<'static>, Error> {
        self.cert
            .first()
            .ok_or(Error::NoCertificatesPresented)
    }
}

impl fmt::Debug for CertifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertifiedKey")
            .field("cert", &self.cert)
            .field("algorithm", &self.key.algorithm())
            .field("ocsp", &self.ocsp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullKey;

    impl SigningKey for NullKey {
        fn choose_scheme(&self, _offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
            None
        }

        fn algorithm(&self) -> SignatureAlgorithm {
            SignatureAlgorithm::ECDSA
        }
    }

    #[test]
    fn end_entity_is_first() {
        let ck = CertifiedKey::new(
            vec![CertificateDer::from(vec![1]), CertificateDer::from(vec![2])],
            Arc::new(NullKey),
        );
        assert_eq!(ck.end_entity_cert().unwrap().as_ref(), &[1]);
        assert!(format!("{:?}", ck).contains("ECDSA"));
    }

    #[test]
    fn empty_chain_has_no_end_entity() {
        let ck = CertifiedKey::new(Vec::new(), Arc::new(NullKey));
        assert_eq!(
            ck.end_entity_cert().unwrap_err(),
            Error::NoCertificatesPresented
        );
    }
}
