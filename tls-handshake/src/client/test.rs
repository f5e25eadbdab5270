use core::task::Poll;
use std::sync::Arc;

use pki_types::{CertificateDer, ServerName, UnixTime};

use super::config::ClientConfig;
use crate::crypto::ring::default_provider;
use crate::enums::SignatureScheme;
use crate::error::Error;
use crate::verify::{
    DigitallySignedStruct, HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    VerifyTicket,
};

/// Accepts every chain and signature.
#[derive(Debug)]
pub(crate) struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn begin_verify(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _scts: &[u8],
        _now: UnixTime,
    ) -> Result<VerifyTicket, Error> {
        Ok(VerifyTicket::new(0))
    }

    fn poll(&self, _ticket: &VerifyTicket) -> Poll<Result<ServerCertVerified, Error>> {
        Poll::Ready(Ok(ServerCertVerified::default()))
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_legacy_signature(
        &self,
        _digest: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
        ]
    }
}

pub(crate) fn server_name() -> ServerName<'static> {
    ServerName::try_from("example.com").unwrap()
}

pub(crate) fn config() -> ClientConfig {
    ClientConfig::new(default_provider(), Arc::new(NoVerifier))
}
