use core::fmt;

use crate::crypto::hash::{self, HashAlgorithm};
use crate::crypto::hmac;
use crate::crypto::ring::{hash_for, hmac_for};
use crate::crypto::KeyExchangeAlgorithm;
use crate::enums::{CipherSuite, ProtocolVersion, SignatureAlgorithm};

/// How the server proves its identity under a cipher suite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authentication {
    /// RSA certificate.
    Rsa,
    /// ECDSA certificate.
    Ecdsa,
    /// Knowledge of a pre-shared key; no certificate.
    Psk,
    /// None at all.
    Anonymous,
}

/// The record protection a suite uses.  The core never runs these; it
/// only cuts key material of the right shape for the record layer.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkAlgorithm {
    /// RC4 with a 128-bit key.
    Rc4_128,
    /// Triple-DES EDE in CBC mode.
    TripleDesCbc,
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-256 in CBC mode.
    Aes256Cbc,
    /// AES-128-GCM.
    Aes128Gcm,
    /// AES-256-GCM.
    Aes256Gcm,
    /// ChaCha20-Poly1305 (RFC 7905).
    Chacha20Poly1305,
}

impl BulkAlgorithm {
    /// Length of the cipher key in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Rc4_128 | Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::TripleDesCbc => 24,
            Self::Aes256Cbc | Self::Aes256Gcm | Self::Chacha20Poly1305 => 32,
        }
    }

    fn block_len(self) -> usize {
        match self {
            Self::TripleDesCbc => 8,
            Self::Aes128Cbc | Self::Aes256Cbc => 16,
            _ => 0,
        }
    }

    /// True for the AEAD constructions, which need no separate MAC key.
    pub fn is_aead(self) -> bool {
        matches!(
            self,
            Self::Aes128Gcm | Self::Aes256Gcm | Self::Chacha20Poly1305
        )
    }
}

/// The record MAC a suite uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacAlgorithm {
    /// HMAC-SHA1.
    HmacSha1,
    /// HMAC-SHA256.
    HmacSha256,
    /// HMAC-SHA384.
    HmacSha384,
    /// Integrity comes from the AEAD.
    Aead,
}

impl MacAlgorithm {
    /// Length of the MAC key in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
            Self::HmacSha384 => 48,
            Self::Aead => 0,
        }
    }
}

/// A cipher suite supported by this crate.
///
/// All possible instances of this type are provided by the library in
/// the [`ALL_CIPHER_SUITES`] array.
#[derive(PartialEq, Eq)]
pub struct SupportedCipherSuite {
    /// The TLS enumeration naming this cipher suite.
    pub suite: CipherSuite,
    /// How the pre-master secret is agreed.
    pub kx: KeyExchangeAlgorithm,
    /// How the server authenticates.
    pub auth: Authentication,
    /// Record encryption.
    pub bulk: BulkAlgorithm,
    /// Record integrity.
    pub mac: MacAlgorithm,
    /// The PRF hash under TLS 1.2.  Earlier versions always use the
    /// MD5/SHA-1 split PRF.
    pub prf: HashAlgorithm,
    /// The earliest version this suite may be negotiated at.
    pub min_version: ProtocolVersion,
    /// Effective symmetric strength.
    pub strength_bits: u16,
}

impl fmt::Debug for SupportedCipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.suite.fmt(f)
    }
}

impl SupportedCipherSuite {
    /// Whether the suite may be used at `version`.
    pub fn usable_for_version(&self, version: ProtocolVersion) -> bool {
        version >= self.min_version
    }

    /// Cipher key length.
    pub fn key_len(&self) -> usize {
        self.bulk.key_len()
    }

    /// MAC key length; zero for AEAD suites.
    pub fn mac_key_len(&self) -> usize {
        self.mac.key_len()
    }

    /// The implicit IV (or AEAD salt) cut from the key block.
    ///
    /// CBC suites only take an IV from the key block under TLS 1.0; later
    /// versions carry an explicit IV in every record.
    pub fn fixed_iv_len(&self, version: ProtocolVersion) -> usize {
        match self.bulk {
            BulkAlgorithm::Aes128Gcm | BulkAlgorithm::Aes256Gcm => 4,
            BulkAlgorithm::Chacha20Poly1305 => 12,
            BulkAlgorithm::Rc4_128 => 0,
            cbc if version == ProtocolVersion::TLSv1_0 => cbc.block_len(),
            _ => 0,
        }
    }

    /// The per-record explicit nonce carried by GCM records.
    pub fn explicit_nonce_len(&self) -> usize {
        match self.bulk {
            BulkAlgorithm::Aes128Gcm | BulkAlgorithm::Aes256Gcm => 8,
            _ => 0,
        }
    }

    /// Total key block needed at `version`: two MAC keys, two cipher keys
    /// and two fixed IVs.
    pub fn key_block_len(&self, version: ProtocolVersion) -> usize {
        2 * (self.mac_key_len() + self.key_len() + self.fixed_iv_len(version))
    }

    /// The signature algorithm the server's key exchange is signed with,
    /// if any.
    pub fn sign_algorithm(&self) -> Option<SignatureAlgorithm> {
        match self.auth {
            Authentication::Rsa => Some(SignatureAlgorithm::RSA),
            Authentication::Ecdsa => Some(SignatureAlgorithm::ECDSA),
            Authentication::Psk | Authentication::Anonymous => None,
        }
    }

    /// Whether the server sends a Certificate message under this suite.
    pub fn server_sends_certificate(&self) -> bool {
        matches!(self.auth, Authentication::Rsa | Authentication::Ecdsa)
    }

    /// Whether application data may be sent under this suite before the
    /// server's Finished: an ephemeral key exchange, an AEAD and at
    /// least 128 bits.
    pub fn allows_false_start(&self) -> bool {
        matches!(self.kx, KeyExchangeAlgorithm::Ecdhe | KeyExchangeAlgorithm::Dhe)
            && self.bulk.is_aead()
            && self.strength_bits >= 128
    }

    /// The hash behind the TLS 1.2 PRF and transcript.
    pub(crate) fn prf_hash(&self) -> &'static dyn hash::Hash {
        match hash_for(self.prf) {
            Some(h) => h,
            None => &crate::crypto::ring::hash::SHA256,
        }
    }

    /// HMAC with the TLS 1.2 PRF hash.
    pub(crate) fn prf_hmac(&self) -> &'static dyn hmac::Hmac {
        match hmac_for(self.prf) {
            Some(h) => h,
            None => &crate::crypto::ring::hmac::HMAC_SHA256,
        }
    }
}

macro_rules! suite {
    ($name:ident, $id:ident, $kx:ident, $auth:ident, $bulk:ident, $mac:ident, $prf:ident, $min:ident, $bits:literal) => {
        #[doc = concat!("The `", stringify!($id), "` cipher suite.")]
        pub static $name: SupportedCipherSuite = SupportedCipherSuite {
            suite: CipherSuite::$id,
            kx: KeyExchangeAlgorithm::$kx,
            auth: Authentication::$auth,
            bulk: BulkAlgorithm::$bulk,
            mac: MacAlgorithm::$mac,
            prf: HashAlgorithm::$prf,
            min_version: ProtocolVersion::$min,
            strength_bits: $bits,
        };
    };
}

suite!(TLS_RSA_WITH_RC4_128_SHA, TLS_RSA_WITH_RC4_128_SHA, Rsa, Rsa, Rc4_128, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_RSA_WITH_3DES_EDE_CBC_SHA, TLS_RSA_WITH_3DES_EDE_CBC_SHA, Rsa, Rsa, TripleDesCbc, HmacSha1, SHA256, TLSv1_0, 112);
suite!(TLS_RSA_WITH_AES_128_CBC_SHA, TLS_RSA_WITH_AES_128_CBC_SHA, Rsa, Rsa, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_DHE_RSA_WITH_AES_128_CBC_SHA, TLS_DHE_RSA_WITH_AES_128_CBC_SHA, Dhe, Rsa, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_DH_anon_WITH_AES_128_CBC_SHA, TLS_DH_anon_WITH_AES_128_CBC_SHA, DhAnon, Anonymous, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_RSA_WITH_AES_256_CBC_SHA, TLS_RSA_WITH_AES_256_CBC_SHA, Rsa, Rsa, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_DHE_RSA_WITH_AES_256_CBC_SHA, TLS_DHE_RSA_WITH_AES_256_CBC_SHA, Dhe, Rsa, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_RSA_WITH_AES_128_CBC_SHA256, TLS_RSA_WITH_AES_128_CBC_SHA256, Rsa, Rsa, Aes128Cbc, HmacSha256, SHA256, TLSv1_2, 128);
suite!(TLS_DHE_RSA_WITH_AES_128_CBC_SHA256, TLS_DHE_RSA_WITH_AES_128_CBC_SHA256, Dhe, Rsa, Aes128Cbc, HmacSha256, SHA256, TLSv1_2, 128);
suite!(TLS_PSK_WITH_RC4_128_SHA, TLS_PSK_WITH_RC4_128_SHA, Psk, Psk, Rc4_128, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_PSK_WITH_AES_128_CBC_SHA, TLS_PSK_WITH_AES_128_CBC_SHA, Psk, Psk, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_PSK_WITH_AES_256_CBC_SHA, TLS_PSK_WITH_AES_256_CBC_SHA, Psk, Psk, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_RSA_WITH_AES_128_GCM_SHA256, TLS_RSA_WITH_AES_128_GCM_SHA256, Rsa, Rsa, Aes128Gcm, Aead, SHA256, TLSv1_2, 128);
suite!(TLS_RSA_WITH_AES_256_GCM_SHA384, TLS_RSA_WITH_AES_256_GCM_SHA384, Rsa, Rsa, Aes256Gcm, Aead, SHA384, TLSv1_2, 256);
suite!(TLS_DHE_RSA_WITH_AES_128_GCM_SHA256, TLS_DHE_RSA_WITH_AES_128_GCM_SHA256, Dhe, Rsa, Aes128Gcm, Aead, SHA256, TLSv1_2, 128);
suite!(TLS_DHE_RSA_WITH_AES_256_GCM_SHA384, TLS_DHE_RSA_WITH_AES_256_GCM_SHA384, Dhe, Rsa, Aes256Gcm, Aead, SHA384, TLSv1_2, 256);
suite!(TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA, TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA, Ecdhe, Ecdsa, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA, TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA, Ecdhe, Ecdsa, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA, TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA, Ecdhe, Rsa, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA, TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA, Ecdhe, Rsa, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_ECDH_anon_WITH_AES_128_CBC_SHA, TLS_ECDH_anon_WITH_AES_128_CBC_SHA, EcdhAnon, Anonymous, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256, TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256, Ecdhe, Ecdsa, Aes128Gcm, Aead, SHA256, TLSv1_2, 128);
suite!(TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384, TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384, Ecdhe, Ecdsa, Aes256Gcm, Aead, SHA384, TLSv1_2, 256);
suite!(TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256, TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256, Ecdhe, Rsa, Aes128Gcm, Aead, SHA256, TLSv1_2, 128);
suite!(TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, Ecdhe, Rsa, Aes256Gcm, Aead, SHA384, TLSv1_2, 256);
suite!(TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA, TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA, EcdhePsk, Psk, Aes128Cbc, HmacSha1, SHA256, TLSv1_0, 128);
suite!(TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA, TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA, EcdhePsk, Psk, Aes256Cbc, HmacSha1, SHA256, TLSv1_0, 256);
suite!(TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256, TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256, Ecdhe, Rsa, Chacha20Poly1305, Aead, SHA256, TLSv1_2, 256);
suite!(TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256, TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256, Ecdhe, Ecdsa, Chacha20Poly1305, Aead, SHA256, TLSv1_2, 256);

/// Every suite this crate knows, sorted by wire id.
pub static ALL_CIPHER_SUITES: &[&SupportedCipherSuite] = &[
    &TLS_RSA_WITH_RC4_128_SHA,
    &TLS_RSA_WITH_3DES_EDE_CBC_SHA,
    &TLS_RSA_WITH_AES_128_CBC_SHA,
    &TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    &TLS_DH_anon_WITH_AES_128_CBC_SHA,
    &TLS_RSA_WITH_AES_256_CBC_SHA,
    &TLS_DHE_RSA_WITH_AES_256_CBC_SHA,
    &TLS_RSA_WITH_AES_128_CBC_SHA256,
    &TLS_DHE_RSA_WITH_AES_128_CBC_SHA256,
    &TLS_PSK_WITH_RC4_128_SHA,
    &TLS_PSK_WITH_AES_128_CBC_SHA,
    &TLS_PSK_WITH_AES_256_CBC_SHA,
    &TLS_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_DHE_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_DHE_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    &TLS_ECDH_anon_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_PSK_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_PSK_WITH_AES_256_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
];

/// The default preference order: forward-secret AEAD first, then CBC,
/// then static RSA.  Anonymous and PSK suites are only offered when
/// listed explicitly.
pub static DEFAULT_CIPHER_SUITES: &[&SupportedCipherSuite] = &[
    &TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    &TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    &TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_DHE_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    &TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
    &TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    &TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
    &TLS_DHE_RSA_WITH_AES_256_CBC_SHA,
    &TLS_RSA_WITH_AES_128_GCM_SHA256,
    &TLS_RSA_WITH_AES_256_GCM_SHA384,
    &TLS_RSA_WITH_AES_128_CBC_SHA,
    &TLS_RSA_WITH_AES_256_CBC_SHA,
    &TLS_RSA_WITH_3DES_EDE_CBC_SHA,
];

/// Find the suite with wire id `id`.
pub fn lookup_by_id(id: CipherSuite) -> Option<&'static SupportedCipherSuite> {
    let wanted = u16::from(id);
    ALL_CIPHER_SUITES
        .binary_search_by_key(&wanted, |scs| u16::from(scs.suite))
        .ok()
        .map(|idx| ALL_CIPHER_SUITES[idx])
}

/// Local restrictions applied on top of the configured preference order.
#[derive(Clone, Debug)]
pub struct CipherPolicy {
    /// Suites to offer, most preferred first.
    pub preference: Vec<&'static SupportedCipherSuite>,
    /// Suites weaker than this are never offered.
    pub min_strength_bits: u16,
    /// Suites never to offer, regardless of `preference`.
    pub disabled: Vec<CipherSuite>,
}

impl Default for CipherPolicy {
    fn default() -> Self {
        Self {
            preference: DEFAULT_CIPHER_SUITES.to_vec(),
            min_strength_bits: 112,
            disabled: Vec::new(),
        }
    }
}

/// The suites from `policy` usable at `version`, in preference order.
pub fn enumerate_supported(
    version: ProtocolVersion,
    policy: &CipherPolicy,
) -> Vec<&'static SupportedCipherSuite> {
    policy
        .preference
        .iter()
        .filter(|scs| scs.usable_for_version(version))
        .filter(|scs| scs.strength_bits >= policy.min_strength_bits)
        .filter(|scs| !policy.disabled.contains(&scs.suite))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in ALL_CIPHER_SUITES.windows(2) {
            assert!(u16::from(pair[0].suite) < u16::from(pair[1].suite));
        }
    }

    #[test]
    fn every_suite_is_found_by_id() {
        for scs in ALL_CIPHER_SUITES {
            assert_eq!(lookup_by_id(scs.suite), Some(*scs));
        }
        assert!(lookup_by_id(CipherSuite::TLS_NULL_WITH_NULL_NULL).is_none());
        assert!(lookup_by_id(CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV).is_none());
        assert!(lookup_by_id(CipherSuite::Unknown(0x1301)).is_none());
    }

    #[test]
    fn default_suites_are_all_registered() {
        for scs in DEFAULT_CIPHER_SUITES {
            assert!(lookup_by_id(scs.suite).is_some());
        }
    }

    #[test]
    fn aead_suites_need_tls12() {
        for scs in ALL_CIPHER_SUITES {
            if scs.bulk.is_aead() {
                assert_eq!(scs.mac, MacAlgorithm::Aead);
                assert_eq!(scs.min_version, ProtocolVersion::TLSv1_2);
            }
        }
    }

    #[test]
    fn enumerate_filters_by_version() {
        let policy = CipherPolicy::default();
        let tls10 = enumerate_supported(ProtocolVersion::TLSv1_0, &policy);
        assert!(tls10
            .iter()
            .all(|scs| scs.min_version == ProtocolVersion::TLSv1_0));
        assert!(!tls10.contains(&&TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256));

        let tls12 = enumerate_supported(ProtocolVersion::TLSv1_2, &policy);
        assert_eq!(tls12.len(), DEFAULT_CIPHER_SUITES.len());
        assert_eq!(tls12[0].suite, DEFAULT_CIPHER_SUITES[0].suite);
    }

    #[test]
    fn enumerate_filters_by_strength_and_disabled() {
        let policy = CipherPolicy {
            preference: vec![
                &TLS_RSA_WITH_3DES_EDE_CBC_SHA,
                &TLS_RSA_WITH_AES_256_CBC_SHA,
                &TLS_RSA_WITH_AES_128_CBC_SHA,
            ],
            min_strength_bits: 128,
            disabled: vec![CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA],
        };
        let got = enumerate_supported(ProtocolVersion::TLSv1_2, &policy);
        assert_eq!(got, vec![&TLS_RSA_WITH_AES_128_CBC_SHA]);
    }

    #[test]
    fn key_block_shapes() {
        let v12 = ProtocolVersion::TLSv1_2;
        let v10 = ProtocolVersion::TLSv1_0;

        // 2 * (0 + 16 + 4)
        assert_eq!(TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.key_block_len(v12), 40);
        assert_eq!(TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.explicit_nonce_len(), 8);
        // 2 * (0 + 32 + 12)
        assert_eq!(TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256.key_block_len(v12), 88);
        // 2 * (20 + 16 + 0) at TLS 1.1 and later, plus 2 * 16 IV at TLS 1.0
        assert_eq!(TLS_RSA_WITH_AES_128_CBC_SHA.key_block_len(v12), 72);
        assert_eq!(TLS_RSA_WITH_AES_128_CBC_SHA.key_block_len(v10), 104);
        // 2 * (20 + 24 + 8)
        assert_eq!(TLS_RSA_WITH_3DES_EDE_CBC_SHA.key_block_len(v10), 104);
        assert_eq!(TLS_RSA_WITH_RC4_128_SHA.fixed_iv_len(v10), 0);
    }

    #[test]
    fn signature_algorithms() {
        assert_eq!(
            TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256.sign_algorithm(),
            Some(SignatureAlgorithm::ECDSA)
        );
        assert_eq!(TLS_PSK_WITH_AES_128_CBC_SHA.sign_algorithm(), None);
        assert!(!TLS_DH_anon_WITH_AES_128_CBC_SHA.server_sends_certificate());
        assert!(TLS_RSA_WITH_AES_128_CBC_SHA.server_sends_certificate());
    }

    #[test]
    fn prf_hash_follows_suite() {
        assert_eq!(
            TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
                .prf_hash()
                .algorithm(),
            HashAlgorithm::SHA384
        );
        assert_eq!(
            TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
                .prf_hash()
                .algorithm(),
            HashAlgorithm::SHA256
        );
    }

    #[test]
    fn false_start_needs_ephemeral_aead() {
        assert!(TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.allows_false_start());
        assert!(TLS_DHE_RSA_WITH_AES_128_GCM_SHA256.allows_false_start());
        // static RSA is not forward secret
        assert!(!TLS_RSA_WITH_AES_128_GCM_SHA256.allows_false_start());
        assert!(!TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA.allows_false_start());
    }
}
