use core::fmt;
use core::task::Poll;
use std::sync::Arc;

use pki_types::{CertificateDer, ServerName};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};

use crate::client::config::{
    ChannelIdKey, ChannelIdProvider, NextProtocolSelector, PskLookup, PskProvider,
    ResolvesClientCert,
};
use crate::enums::{SignatureAlgorithm, SignatureScheme};
use crate::error::Error;
use crate::msgs::enums::ClientCertificateType;
use crate::sign;

#[derive(Debug)]
pub(super) struct FailResolveClientCert {}

impl ResolvesClientCert for FailResolveClientCert {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
        _cert_types: &[ClientCertificateType],
    ) -> Option<Arc<sign::CertifiedKey>> {
        None
    }

    fn has_certs(&self) -> bool {
        false
    }
}

/// Always offers the same certificate chain and key, whatever the
/// server asks for.
pub struct AlwaysResolvesClientCert(Arc<sign::CertifiedKey>);

impl AlwaysResolvesClientCert {
    /// Offer `chain`, end-entity first, authenticated by `private_key`.
    pub fn new(
        private_key: Arc<dyn sign::SigningKey>,
        chain: Vec<CertificateDer<'static>>,
    ) -> Result<Self, Error> {
        let key = sign::CertifiedKey::new(chain, private_key);
        key.end_entity_cert()?;
        Ok(Self(Arc::new(key)))
    }
}

impl ResolvesClientCert for AlwaysResolvesClientCert {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
        _cert_types: &[ClientCertificateType],
    ) -> Option<Arc<sign::CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }

    fn has_certs(&self) -> bool {
        true
    }
}

impl fmt::Debug for AlwaysResolvesClientCert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlwaysResolvesClientCert")
            .field("cert", &self.0.cert)
            .finish()
    }
}

/// The client certificate type a key of algorithm `alg` is sent as.
pub(crate) fn certificate_type_for(alg: SignatureAlgorithm) -> Option<ClientCertificateType> {
    match alg {
        SignatureAlgorithm::RSA => Some(ClientCertificateType::RSASign),
        SignatureAlgorithm::ECDSA => Some(ClientCertificateType::ECDSASign),
        _ => None,
    }
}

/// A single pre-shared key, used whatever the server's hint.
pub struct StaticPsk {
    identity: Vec<u8>,
    key: Vec<u8>,
}

impl StaticPsk {
    /// Offer `key` under `identity`.
    pub fn new(identity: &[u8], key: &[u8]) -> Self {
        Self {
            identity: identity.to_vec(),
            key: key.to_vec(),
        }
    }
}

impl PskProvider for StaticPsk {
    fn lookup(&self, _identity_hint: Option<&[u8]>) -> PskLookup {
        PskLookup::Found {
            identity: self.identity.clone(),
            key: self.key.clone(),
        }
    }
}

impl fmt::Debug for StaticPsk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Note: we omit the key.
        f.debug_struct("StaticPsk")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// A Channel ID key backed by *ring*'s ECDSA P-256.
pub struct EcdsaChannelIdKey {
    key: EcdsaKeyPair,
    rng: SystemRandom,
}

impl EcdsaChannelIdKey {
    /// Load a P-256 key from PKCS#8 DER.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, Error> {
        let rng = SystemRandom::new();
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, der, &rng)
            .map_err(|_| Error::General("cannot load Channel ID key".into()))?;
        Ok(Self { key, rng })
    }

    /// Make a fresh key.
    pub fn generate() -> Result<Self, Error> {
        let rng = SystemRandom::new();
        let der = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|_| Error::FailedToGetRandomBytes)?;
        Self::from_pkcs8(der.as_ref())
    }
}

impl ChannelIdKey for EcdsaChannelIdKey {
    fn public_key(&self) -> [u8; 64] {
        // uncompressed point: 0x04 ‖ x ‖ y
        let point = self.key.public_key().as_ref();
        let mut xy = [0u8; 64];
        xy.copy_from_slice(&point[1..65]);
        xy
    }

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], Error> {
        let sig = self
            .key
            .sign(&self.rng, message)
            .map_err(|_| Error::General("Channel ID signing failed".into()))?;
        let mut rs = [0u8; 64];
        rs.copy_from_slice(sig.as_ref());
        Ok(rs)
    }
}

/// Hands out the same Channel ID key for every host.
pub struct AlwaysChannelId(Arc<dyn ChannelIdKey>);

impl AlwaysChannelId {
    /// Use `key` everywhere.
    pub fn new(key: Arc<dyn ChannelIdKey>) -> Self {
        Self(key)
    }
}

impl ChannelIdProvider for AlwaysChannelId {
    fn channel_id_key(
        &self,
        _server_name: &ServerName<'_>,
    ) -> Poll<Result<Arc<dyn ChannelIdKey>, Error>> {
        Poll::Ready(Ok(Arc::clone(&self.0)))
    }
}

impl fmt::Debug for AlwaysChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AlwaysChannelId")
            .field(&"..")
            .finish()
    }
}

/// Picks the first of our protocols that the server also lists.  With
/// no overlap, our first protocol is used anyway, as NPN allows.
#[derive(Debug)]
pub struct ProtocolPreference(Vec<Vec<u8>>);

impl ProtocolPreference {
    /// Prefer `protocols` in this order.  Must not be empty.
    pub fn new(protocols: &[&[u8]]) -> Self {
        Self(protocols.iter().map(|p| p.to_vec()).collect())
    }
}

impl NextProtocolSelector for ProtocolPreference {
    fn select(&self, server_protocols: &[&[u8]]) -> Vec<u8> {
        self.0
            .iter()
            .find(|ours| server_protocols.contains(&ours.as_slice()))
            .or_else(|| self.0.first())
            .cloned()
            .unwrap_or_default()
    }
}
