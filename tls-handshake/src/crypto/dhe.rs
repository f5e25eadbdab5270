use std::fmt;

use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::crypto::{ActiveKeyExchange, DheKeyExchange, SecureRandom, SharedSecret};
use crate::error::{Error, PeerMisbehaved};

/// Length of the private exponent we draw, in bytes.
const PRIVATE_EXPONENT_LEN: usize = 64;

/// Finite-field Diffie-Hellman computed with `num-bigint`.
///
/// *ring* has no FFDHE, and the groups here are whatever the server sends
/// in its ServerKeyExchange.
pub static BIGNUM_DHE: &dyn DheKeyExchange = &BigNumDhe;

struct BigNumDhe;

impl fmt::Debug for BigNumDhe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BigNumDhe")
    }
}

impl DheKeyExchange for BigNumDhe {
    fn start(
        &self,
        p: &[u8],
        g: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn ActiveKeyExchange>, Error> {
        let mut x = vec![0; PRIVATE_EXPONENT_LEN];
        secure_random.fill(&mut x)?;
        let exponent = BigUint::from_bytes_be(&x);
        x.zeroize();

        let modulus = BigUint::from_bytes_be(p);
        let generator = BigUint::from_bytes_be(g);
        let public = generator.modpow(&exponent, &modulus);

        Ok(Box::new(ActiveDhe {
            public: to_bytes_be_with_len(&public, p.len()),
            exponent,
            modulus,
        }))
    }
}

struct ActiveDhe {
    public: Vec<u8>,
    exponent: BigUint,
    modulus: BigUint,
}

impl ActiveKeyExchange for ActiveDhe {
    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<SharedSecret, Error> {
        let peer = BigUint::from_bytes_be(peer_pub_key);

        // 1 < Ys < p - 1
        let one = BigUint::from(1u8);
        if peer <= one || peer >= &self.modulus - &one {
            return Err(PeerMisbehaved::InvalidKeyShare.into());
        }

        // leading zero bytes are stripped from the agreed value
        let secret = peer.modpow(&self.exponent, &self.modulus);
        Ok(SharedSecret::from(secret.to_bytes_be()))
    }

    fn pub_key(&self) -> &[u8] {
        &self.public
    }
}

/// Big-endian bytes of `n`, left-padded with zeros to `len_bytes`.
pub(crate) fn to_bytes_be_with_len(n: &BigUint, len_bytes: usize) -> Vec<u8> {
    let mut bytes = n.to_bytes_le();
    bytes.resize(len_bytes, 0);
    bytes.reverse();
    bytes
}

/// The number of significant bits in the big-endian integer `p`.
pub(crate) fn bit_length(p: &[u8]) -> u64 {
    BigUint::from_bytes_be(p).bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ring;

    // RFC 2409 Oakley group 2 (1024-bit MODP)
    const P: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
                     29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
                     EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
                     E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
                     EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381\
                     FFFFFFFFFFFFFFFF";

    fn prime() -> Vec<u8> {
        BigUint::parse_bytes(P.as_bytes(), 16)
            .unwrap()
            .to_bytes_be()
    }

    #[test]
    fn both_sides_agree() {
        let p = prime();
        let rng = ring::default_provider().secure_random;
        let a = BIGNUM_DHE.start(&p, &[2], rng).unwrap();
        let b = BIGNUM_DHE.start(&p, &[2], rng).unwrap();
        assert_eq!(a.pub_key().len(), p.len());

        let b_pub = b.pub_key().to_vec();
        let a_pub = a.pub_key().to_vec();
        let s1 = a.complete(&b_pub).unwrap();
        let s2 = b.complete(&a_pub).unwrap();
        assert_eq!(s1.secret_bytes(), s2.secret_bytes());
        assert!(s1.secret_bytes().len() <= p.len());
    }

    #[test]
    fn degenerate_peer_values_are_rejected() {
        let p = prime();
        let rng = ring::default_provider().secure_random;
        for bad in [vec![0u8], vec![1u8], p.clone()] {
            let kx = BIGNUM_DHE.start(&p, &[2], rng).unwrap();
            assert!(kx.complete(&bad).is_err());
        }
    }

    #[test]
    fn bit_length_ignores_leading_zeros() {
        assert_eq!(bit_length(&[0x00, 0x80, 0x00]), 16);
        assert_eq!(bit_length(&prime()), 1024);
    }
}
