use core::fmt::Debug;
use core::task::Poll;

use pki_types::{CertificateDer, ServerName, UnixTime};

use crate::crypto::hash::Hash;
use crate::crypto::legacy::MD5_SHA1;
use crate::crypto::ring::hash::SHA1;
use crate::enums::SignatureScheme;
use crate::error::{Error, InvalidMessage};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::tls12::ConnectionRandoms;

// Marker types.  These are used to bind the fact some verification
// (certificate chain or handshake signature) has taken place into
// protocol states.  We use this to have the compiler check that there
// are no 'goto fail'-style elisions of important checks before we
// reach the established state.
//
// These types are public, but cannot be directly constructed.  This
// means their origins can be precisely determined by looking
// for their `assertion` constructors.

/// Zero-sized marker type representing verification of a signature.
#[derive(Debug)]
pub struct HandshakeSignatureValid(());

impl HandshakeSignatureValid {
    /// Make a `HandshakeSignatureValid`
    pub fn assertion() -> Self {
        Self(())
    }
}

#[derive(Debug)]
pub(crate) struct FinishedMessageVerified(());

impl FinishedMessageVerified {
    pub(crate) fn assertion() -> Self {
        Self(())
    }
}

/// The outcome of a successful certificate chain verification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerCertVerified {
    ev: bool,
    public_key_hashes: Vec<Vec<u8>>,
}

impl ServerCertVerified {
    /// Record a verified chain.  `ev` is set when the chain qualifies for
    /// extended validation; `public_key_hashes` are the hashes of every
    /// public key in the verified chain, for pinning.
    pub fn new(ev: bool, public_key_hashes: Vec<Vec<u8>>) -> Self {
        Self {
            ev,
            public_key_hashes,
        }
    }

    /// True if the chain qualified for extended validation.
    pub fn is_ev(&self) -> bool {
        self.ev
    }

    /// Hashes of the public keys in the verified chain.
    pub fn public_key_hashes(&self) -> &[Vec<u8>] {
        &self.public_key_hashes
    }
}

/// Names an in-flight verification started by
/// [`ServerCertVerifier::begin_verify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VerifyTicket(u64);

impl VerifyTicket {
    /// Wrap a verifier-chosen identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The verifier-chosen identifier.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Something that can verify a server certificate chain, and verify
/// signatures made by certificates.
///
/// Chain verification may take a while (fetching intermediates, checking
/// revocation), so it is split in two: the handshake starts it with
/// `begin_verify` and then polls until it finishes.  While `poll`
/// returns `Poll::Pending` the handshake suspends and reports
/// [`crate::client::Progress::PendingCertificateVerification`].
pub trait ServerCertVerifier: Debug + Send + Sync {
    /// Start verifying that `end_entity` is valid for `server_name` and
    /// chains to a trust anchor.
    ///
    /// `intermediates` contains all certificates other than `end_entity`
    /// that were sent in the server's Certificate message, in the order
    /// they were sent.  `ocsp_response` is the stapled OCSP response and
    /// `scts` the raw signed certificate timestamp list; either is empty
    /// if the server did not send one.
    ///
    /// None of the certificates have been parsed.  Verifiers should return
    /// [`crate::CertificateError::BadEncoding`] for malformed input.
    fn begin_verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        scts: &[u8],
        now: UnixTime,
    ) -> Result<VerifyTicket, Error>;

    /// Check on a verification started by `begin_verify`.
    ///
    /// Once this returns `Poll::Ready` the ticket is spent.
    fn poll(&self, ticket: &VerifyTicket) -> Poll<Result<ServerCertVerified, Error>>;

    /// Verify a TLS 1.2 signature allegedly by the given server certificate.
    ///
    /// `message` is not hashed, and needs hashing during the verification.
    /// The signature and algorithm are within `dss`.  `cert` contains the
    /// public key to use, and has already been accepted by `poll`.
    ///
    /// If and only if the signature is valid, return
    /// `Ok(HandshakeSignatureValid)`.  Otherwise, return an error; the
    /// handshake will send an alert and abort.
    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error>;

    /// Verify a TLS 1.0 or 1.1 signature over a precomputed digest.
    ///
    /// For `SignatureScheme::RSA_PKCS1_MD5_SHA1` the digest is the 36-byte
    /// concatenation of the MD5 and SHA-1 hashes of the signed content,
    /// to be checked as a PKCS#1 v1.5 signature with no DigestInfo.  For
    /// `SignatureScheme::ECDSA_SHA1_Legacy` it is the SHA-1 hash.
    fn verify_legacy_signature(
        &self,
        digest: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error>;

    /// Return the list of SignatureSchemes that this verifier will handle,
    /// in `verify_tls12_signature` calls.
    ///
    /// This should be in priority order, with the most preferred first.
    /// It is offered in the `signature_algorithms` extension.
    fn supported_verify_schemes(&self) -> Vec<SignatureScheme>;
}

/// The content a server signs in its ServerKeyExchange:
/// `client_random ‖ server_random ‖ params`.
pub(crate) fn construct_server_verify_message(
    randoms: &ConnectionRandoms,
    params: &[u8],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(64 + params.len());
    message.extend_from_slice(&randoms.client);
    message.extend_from_slice(&randoms.server);
    message.extend_from_slice(params);
    message
}

/// The digest a pre-TLS 1.2 signature with `scheme` covers, or `None` for
/// schemes that only exist in TLS 1.2.
pub(crate) fn legacy_digest(scheme: SignatureScheme, message: &[u8]) -> Option<Vec<u8>> {
    match scheme {
        SignatureScheme::RSA_PKCS1_MD5_SHA1 => Some(MD5_SHA1.hash(message).as_ref().to_vec()),
        SignatureScheme::ECDSA_SHA1_Legacy => Some(SHA1.hash(message).as_ref().to_vec()),
        _ => None,
    }
}

/// This type combines a [`SignatureScheme`] and a signature payload produced with that scheme.
#[derive(Debug, Clone)]
pub struct DigitallySignedStruct {
    /// The [`SignatureScheme`] used to produce the signature.
    pub scheme: SignatureScheme,
    sig: PayloadU16,
}

impl DigitallySignedStruct {
    /// Pair a signature with the scheme that produced it.
    pub fn new(scheme: SignatureScheme, sig: Vec<u8>) -> Self {
        Self {
            scheme,
            sig: PayloadU16::new(sig),
        }
    }

    /// Get the signature.
    pub fn signature(&self) -> &[u8] {
        &self.sig.0
    }
}

impl Codec for DigitallySignedStruct {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.scheme.encode(bytes);
        self.sig.encode(bytes);
    }

    fn read(r: &mut Reader) -> Result<Self, InvalidMessage> {
        let scheme = SignatureScheme::read(r)?;
        let sig = PayloadU16::read(r)?;

        Ok(Self { scheme, sig })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertions_are_debug() {
        assert_eq!(
            format!("{:?}", HandshakeSignatureValid::assertion()),
            "HandshakeSignatureValid(())"
        );
        assert_eq!(
            format!("{:?}", FinishedMessageVerified::assertion()),
            "FinishedMessageVerified(())"
        );
    }

    #[test]
    fn server_verify_message_layout() {
        let randoms = ConnectionRandoms {
            client: [1; 32],
            server: [2; 32],
        };
        let message = construct_server_verify_message(&randoms, &[3, 3, 3]);
        assert_eq!(message.len(), 67);
        assert_eq!(&message[..32], &[1; 32]);
        assert_eq!(&message[32..64], &[2; 32]);
        assert_eq!(&message[64..], &[3, 3, 3]);
    }

    #[test]
    fn legacy_digests() {
        let md5_sha1 = legacy_digest(SignatureScheme::RSA_PKCS1_MD5_SHA1, b"abc").unwrap();
        assert_eq!(md5_sha1.len(), 36);
        // MD5("abc")
        assert_eq!(&md5_sha1[..4], &[0x90, 0x01, 0x50, 0x98]);
        // SHA1("abc")
        assert_eq!(&md5_sha1[16..20], &[0xa9, 0x99, 0x3e, 0x36]);

        let sha1 = legacy_digest(SignatureScheme::ECDSA_SHA1_Legacy, b"abc").unwrap();
        assert_eq!(sha1, md5_sha1[16..].to_vec());

        assert!(legacy_digest(SignatureScheme::RSA_PKCS1_SHA256, b"abc").is_none());
    }

    #[test]
    fn dss_codec() {
        let dss = DigitallySignedStruct::new(SignatureScheme::RSA_PKCS1_SHA256, vec![9; 3]);
        let bytes = dss.get_encoding();
        assert_eq!(bytes, vec![0x04, 0x01, 0x00, 0x03, 9, 9, 9]);
        let back = DigitallySignedStruct::read(&mut Reader::init(&bytes)).unwrap();
        assert_eq!(back.scheme, SignatureScheme::RSA_PKCS1_SHA256);
        assert_eq!(back.signature(), &[9, 9, 9]);
    }

    #[test]
    fn verified_metadata() {
        let v = ServerCertVerified::new(true, vec![vec![1; 32]]);
        assert!(v.is_ev());
        assert_eq!(v.public_key_hashes().len(), 1);
        assert!(!ServerCertVerified::default().is_ev());
        assert_eq!(VerifyTicket::new(7).id(), 7);
    }
}
