use std::fmt::Debug;
use std::sync::Arc;

use zeroize::Zeroize;

use crate::error::Error;
use crate::msgs::enums::NamedGroup;

/// *ring* based CryptoProvider.
pub mod ring;

/// Hashing interfaces.
pub mod hash;

/// HMAC interfaces.
pub mod hmac;

/// Finite-field Diffie-Hellman over server-chosen groups.
pub mod dhe;

pub(crate) mod legacy;

pub use crate::rand::GetRandomFailed;

pub use crate::msgs::handshake::KeyExchangeAlgorithm;

/// Controls core cryptography used by the handshake.
///
/// Hashes, HMAC and the PRF are fixed (they come from *ring*, plus MD5 for
/// TLS 1.0 and 1.1).  What varies per provider is the source of randomness
/// and the key exchanges, which is what a deterministic test build needs
/// to replace.
///
/// This crate does not parse certificates, so RSA key transport (which
/// needs the server's public key) is delegated to `rsa_kx`.  Without one,
/// RSA key exchange suites are not offered.
#[derive(Debug, Clone)]
pub struct CryptoProvider {
    /// Elliptic-curve groups, in preference order.
    pub kx_groups: Vec<&'static dyn SupportedKxGroup>,

    /// Finite-field Diffie-Hellman over parameters chosen by the server.
    pub dhe: &'static dyn DheKeyExchange,

    /// Encrypts the RSA pre-master secret to the server's certificate.
    pub rsa_kx: Option<Arc<dyn RsaKeyExchange>>,

    /// Source of cryptographically secure random numbers.
    pub secure_random: &'static dyn SecureRandom,
}

impl CryptoProvider {
    /// Find a configured group by name.
    pub(crate) fn find_kx_group(&self, name: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups
            .iter()
            .find(|group| group.name() == name)
            .copied()
    }
}

/// A source of cryptographically secure randomness.
pub trait SecureRandom: Send + Sync + Debug {
    /// Fill the given buffer with random bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed>;
}

/// A supported key exchange group.
///
/// This has a TLS-level name expressed using the [`NamedGroup`] enum, and
/// a function which produces a [`ActiveKeyExchange`].
pub trait SupportedKxGroup: Send + Sync + Debug {
    /// Start a key exchange.
    ///
    /// This will prepare an ephemeral secret key in the supported group, and a corresponding
    /// public key. The key exchange can be completed by calling [ActiveKeyExchange#complete]
    /// or discarded.
    ///
    /// # Errors
    ///
    /// This can fail if the random source fails during ephemeral key generation.
    fn start(&self) -> Result<Box<dyn ActiveKeyExchange>, Error>;

    /// Named group the SupportedKxGroup operates in.
    fn name(&self) -> NamedGroup;
}

/// Finite-field Diffie-Hellman, where the server picks the group.
pub trait DheKeyExchange: Send + Sync + Debug {
    /// Start a key exchange in the group with prime `p` and generator `g`
    /// (both big-endian, as sent by the server).
    fn start(
        &self,
        p: &[u8],
        g: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn ActiveKeyExchange>, Error>;
}

/// RSA key transport: encrypts the pre-master secret with the public key
/// in the server's end-entity certificate.
pub trait RsaKeyExchange: Send + Sync + Debug {
    /// Return the PKCS#1 v1.5 encryption of `premaster` to the key in
    /// `end_entity_der`.
    fn encrypt_premaster(&self, end_entity_der: &[u8], premaster: &[u8]) -> Result<Vec<u8>, Error>;
}

/// An in-progress key exchange originating from a `SupportedKxGroup` or
/// a `DheKeyExchange`.
pub trait ActiveKeyExchange: Send + Sync {
    /// Completes the key exchange, given the peer's public key.
    ///
    /// The shared secret is returned as a [`SharedSecret`] which can be constructed
    /// from a `&[u8]`.
    ///
    /// This consumes and so terminates the [`ActiveKeyExchange`].
    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<SharedSecret, Error>;

    /// Return the public key being used.
    fn pub_key(&self) -> &[u8];
}

/// The result from `ActiveKeyExchange::complete` as a value.
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Returns the shared secret as a slice of bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<&[u8]> for SharedSecret {
    fn from(source: &[u8]) -> Self {
        Self(source.to_vec())
    }
}

impl From<Vec<u8>> for SharedSecret {
    fn from(source: Vec<u8>) -> Self {
        Self(source)
    }
}
