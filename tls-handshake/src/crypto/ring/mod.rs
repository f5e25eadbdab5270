use crate::crypto::hash::{Hash, HashAlgorithm};
use crate::crypto::hmac::Hmac;
use crate::crypto::{dhe, legacy, CryptoProvider, SecureRandom, SupportedKxGroup};
use crate::rand::GetRandomFailed;

pub(crate) mod hash;
pub(crate) mod hmac;
pub(crate) mod kx;

/// A `CryptoProvider` backed by the [*ring*] crate.
///
/// RSA key transport is left unset: it needs the public key out of the
/// server's certificate, which this crate does not parse.  Set
/// `CryptoProvider::rsa_kx` to offer RSA key exchange suites.
///
/// [*ring*]: https://github.com/briansmith/ring
pub fn default_provider() -> CryptoProvider {
    CryptoProvider {
        kx_groups: ALL_KX_GROUPS.to_vec(),
        dhe: dhe::BIGNUM_DHE,
        rsa_kx: None,
        secure_random: &Ring,
    }
}

/// Default crypto provider.
#[derive(Debug)]
struct Ring;

impl SecureRandom for Ring {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed> {
        use ring::rand::SecureRandom;

        ring::rand::SystemRandom::new()
            .fill(buf)
            .map_err(|_| GetRandomFailed)
    }
}

/// A list of all the key exchange groups supported by this crate.
pub static ALL_KX_GROUPS: &[&dyn SupportedKxGroup] =
    &[kx_group::X25519, kx_group::SECP256R1, kx_group::SECP384R1];

/// All defined key exchange groups supported by *ring* appear in this module.
///
/// [`ALL_KX_GROUPS`] is provided as an array of all of these values.
pub mod kx_group {
    pub use super::kx::{SECP256R1, SECP384R1, X25519};
}

/// The digest for `alg`, if this crate implements it.
pub(crate) fn hash_for(alg: HashAlgorithm) -> Option<&'static dyn Hash> {
    match alg {
        HashAlgorithm::MD5 => Some(&legacy::MD5),
        HashAlgorithm::SHA1 => Some(&hash::SHA1),
        HashAlgorithm::SHA256 => Some(&hash::SHA256),
        HashAlgorithm::SHA384 => Some(&hash::SHA384),
        _ => None,
    }
}

/// HMAC over `alg`, if this crate implements it.
pub(crate) fn hmac_for(alg: HashAlgorithm) -> Option<&'static dyn Hmac> {
    match alg {
        HashAlgorithm::MD5 => Some(&legacy::HMAC_MD5),
        HashAlgorithm::SHA1 => Some(&hmac::HMAC_SHA1),
        HashAlgorithm::SHA256 => Some(&hmac::HMAC_SHA256),
        HashAlgorithm::SHA384 => Some(&hmac::HMAC_SHA384),
        _ => None,
    }
}
